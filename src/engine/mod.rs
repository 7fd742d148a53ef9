mod conflict;
mod error;
mod find_set;
pub mod index;
pub mod iter;
mod mutations;
mod queries;

pub use conflict::conflicts;
pub use error::StoreError;
pub use find_set::{accumulate_run, find_set, find_set_with_gaps};
pub use index::IntervalIndex;
pub use iter::{Direction, FwdIter, GapFill, IntervalCursor, RevIter};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex, MutexGuard, RwLock};
use tracing::{error, info};

use crate::config::Config;
use crate::limits::MAX_INTERVALS_PER_STORE;
use crate::model::*;
use crate::wal::Wal;

// ── WAL writer channel ─────────────────────────────

pub(super) enum WalCommand {
    /// Responds with the number of appends since the last compaction.
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<u64>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
}

/// Background task that owns the WAL. Commands are served strictly in arrival order, which is
/// what lets `commit` enqueue a compaction without racing the next append.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let flush_start = std::time::Instant::now();
                let result = wal.append(&event);
                metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                    .record(flush_start.elapsed().as_secs_f64());
                if let Err(e) = &result {
                    error!("WAL append to {} failed: {e}", wal.path().display());
                }
                let _ = response.send(result);
            }
            WalCommand::Compact { events, response } => {
                let result = wal.compact(&events);
                match &result {
                    Ok(()) => {
                        metrics::counter!(crate::observability::COMPACTIONS_TOTAL).increment(1);
                        info!("compacted WAL {}", wal.path().display());
                    }
                    Err(e) => error!("WAL compaction of {} failed: {e}", wal.path().display()),
                }
                let _ = response.send(result);
            }
        }
    }
}

/// Interval store: a published snapshot plus a single-writer lock.
///
/// Readers clone the snapshot pointer and never block writers. A writer works on a private
/// copy of the index and swaps it in on commit.
pub struct Store {
    published: RwLock<Arc<IntervalIndex>>,
    writer: Mutex<()>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Appends between automatic compactions; 0 disables.
    pub(super) compact_threshold: u64,
    pub(super) max_intervals: usize,
}

impl Store {
    /// Replay the WAL at `wal_path` and start its writer task. Must run inside a Tokio runtime.
    pub fn open(wal_path: PathBuf, compact_threshold: u64) -> Result<Self, StoreError> {
        let (wal, events) =
            Wal::open(&wal_path).map_err(|e| StoreError::StorageFault(e.to_string()))?;

        let mut index = IntervalIndex::new();
        for event in &events {
            match event {
                Event::Committed { intervals } => {
                    for interval in intervals {
                        index.insert(interval.clone())?;
                    }
                }
            }
        }
        info!(
            "opened {}: {} records, {} intervals",
            wal_path.display(),
            events.len(),
            index.len()
        );
        metrics::gauge!(crate::observability::INTERVALS_STORED).set(index.len() as f64);

        let (wal_tx, wal_rx) = mpsc::channel(256);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        Ok(Self {
            published: RwLock::new(Arc::new(index)),
            writer: Mutex::new(()),
            wal_tx,
            compact_threshold,
            max_intervals: MAX_INTERVALS_PER_STORE,
        })
    }

    /// Cap the number of stored intervals below [`MAX_INTERVALS_PER_STORE`].
    pub fn with_max_intervals(mut self, max_intervals: usize) -> Self {
        self.max_intervals = max_intervals.min(MAX_INTERVALS_PER_STORE);
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| StoreError::StorageFault(e.to_string()))?;
        Self::open(config.wal_path(), config.compact_threshold)
    }

    /// Current committed snapshot.
    pub async fn snapshot(&self) -> Arc<IntervalIndex> {
        self.published.read().await.clone()
    }

    /// Read-only transaction over the current snapshot.
    pub async fn begin_read(&self) -> Transaction<'_> {
        Transaction {
            index: self.snapshot().await,
            write: None,
        }
    }

    /// Read-write transaction. Waits until no other writer is active.
    pub async fn begin_write(&self) -> Transaction<'_> {
        let guard = self.writer.lock().await;
        // Snapshot only after the lock: the previous writer has published by now.
        let index = self.snapshot().await;
        Transaction {
            index,
            write: Some(WriteState {
                store: self,
                _guard: guard,
                pending: Vec::new(),
            }),
        }
    }

    pub(super) async fn publish(&self, index: Arc<IntervalIndex>) {
        metrics::gauge!(crate::observability::INTERVALS_STORED).set(index.len() as f64);
        *self.published.write().await = index;
    }

    /// Write event to WAL via the background writer.
    pub(super) async fn wal_append(&self, event: Event) -> Result<u64, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event,
                response: tx,
            })
            .await
            .map_err(|_| StoreError::StorageFault("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::StorageFault("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::StorageFault(e.to_string()))
    }
}

pub(super) struct WriteState<'s> {
    pub(super) store: &'s Store,
    _guard: MutexGuard<'s, ()>,
    pub(super) pending: Vec<Interval>,
}

/// A read-only or read-write view of the store.
///
/// Queries see the snapshot taken at `begin_*` plus, for writers, their own pending adds.
pub struct Transaction<'s> {
    pub(super) index: Arc<IntervalIndex>,
    pub(super) write: Option<WriteState<'s>>,
}

impl Transaction<'_> {
    pub fn is_writable(&self) -> bool {
        self.write.is_some()
    }
}
