use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_WAL_FILE: &str = "spanstore.wal";
const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;

/// Runtime settings, read from `SPANSTORE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub wal_file: String,
    /// Appends between automatic compactions; 0 disables.
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            wal_file: DEFAULT_WAL_FILE.into(),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Missing or unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup("SPANSTORE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            wal_file: lookup("SPANSTORE_WAL_FILE").unwrap_or(defaults.wal_file),
            compact_threshold: lookup("SPANSTORE_COMPACT_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compact_threshold),
            metrics_port: lookup("SPANSTORE_METRICS_PORT").and_then(|s| s.parse().ok()),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(&self.wal_file)
    }
}
