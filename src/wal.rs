use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::model::Event;

/// Encode one event as a complete `[len][bincode][crc32]` record.
fn encode_record(event: &Event) -> io::Result<Vec<u8>> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut record = Vec::with_capacity(payload.len() + 8);
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&payload);
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(record)
}

fn open_for_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Read records until EOF or the first torn/corrupt one. Returns the events and the byte
/// length of the valid prefix.
fn read_log(path: &Path) -> io::Result<(Vec<Event>, u64)> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let mut events = Vec::new();
    let mut valid_len = 0u64;

    loop {
        let mut len_buf = [0u8; 4];
        if !read_or_eof(&mut reader, &mut len_buf)? {
            break;
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        let mut crc_buf = [0u8; 4];
        if !read_or_eof(&mut reader, &mut payload)? || !read_or_eof(&mut reader, &mut crc_buf)? {
            break;
        }
        if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
            break;
        }
        match bincode::deserialize::<Event>(&payload) {
            Ok(event) => events.push(event),
            Err(_) => break,
        }
        valid_len += (len + 8) as u64;
    }

    Ok((events, valid_len))
}

/// `read_exact`, but a short read reports `false` instead of an error.
fn read_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Append-only write-ahead log.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`, where `len` counts only the
/// bincode payload.
///
/// The file always ends on a record boundary. A failed append is cut back off before the
/// error is returned, so it can neither resurface behind a later record nor hide one at
/// replay. If the cut itself fails the log is poisoned and refuses appends until a
/// compaction rewrites it.
pub struct Wal {
    file: File,
    path: PathBuf,
    /// Bytes of acknowledged records.
    len: u64,
    appends_since_compact: u64,
    poisoned: bool,
}

impl Wal {
    /// Open (or create) the log at `path` and return it with the events it holds.
    ///
    /// A torn or corrupt tail left by a crash is truncated away so new records follow the
    /// last good one. Replayed records count toward the next compaction.
    pub fn open(path: &Path) -> io::Result<(Self, Vec<Event>)> {
        let (events, len) = read_log(path)?;
        let file = open_for_append(path)?;
        let on_disk = file.metadata()?.len();
        if on_disk > len {
            warn!(
                "discarding {} trailing bytes of {}",
                on_disk - len,
                path.display()
            );
            file.set_len(len)?;
            file.sync_all()?;
        }
        let wal = Self {
            file,
            path: path.to_path_buf(),
            len,
            appends_since_compact: events.len() as u64,
            poisoned: false,
        };
        Ok((wal, events))
    }

    /// Append one event and fsync. Returns the number of appends since the last compaction,
    /// including this one. On error the log is exactly as it was before the call.
    pub fn append(&mut self, event: &Event) -> io::Result<u64> {
        if self.poisoned {
            return Err(io::Error::other(format!(
                "WAL {} is poisoned by an earlier write failure",
                self.path.display()
            )));
        }
        let record = encode_record(event)?;
        if let Err(e) = self.write_synced(&record) {
            if let Err(cut) = self.discard_tail() {
                error!(
                    "cannot truncate {} after failed append: {cut}",
                    self.path.display()
                );
                self.poisoned = true;
            }
            return Err(e);
        }
        self.len += record.len() as u64;
        self.appends_since_compact += 1;
        Ok(self.appends_since_compact)
    }

    fn write_synced(&mut self, record: &[u8]) -> io::Result<()> {
        self.file.write_all(record)?;
        self.file.sync_data()
    }

    /// Truncate anything past the last acknowledged record.
    fn discard_tail(&mut self) -> io::Result<()> {
        if self.file.metadata()?.len() > self.len {
            self.file.set_len(self.len)?;
            self.file.sync_all()?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the log with `events`, written to a temp file, fsynced and renamed over it.
    /// Clears poisoning once the new file is in place.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        let len = write_snapshot(&tmp_path, events)?;
        fs::rename(&tmp_path, &self.path)?;
        // The old handle now points at the unlinked file; appending through it would be lost.
        match open_for_append(&self.path) {
            Ok(file) => {
                self.file = file;
                self.len = len;
                self.appends_since_compact = 0;
                self.poisoned = false;
                Ok(())
            }
            Err(e) => {
                self.poisoned = true;
                Err(e)
            }
        }
    }

    /// Events currently on disk at `path`.
    #[cfg(test)]
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        read_log(path).map(|(events, _)| events)
    }
}

fn write_snapshot(path: &Path, events: &[Event]) -> io::Result<u64> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut len = 0u64;
    for event in events {
        let record = encode_record(event)?;
        writer.write_all(&record)?;
        len += record.len() as u64;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(len)
}
