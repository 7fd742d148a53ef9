//! Transactional store of prioritized time intervals.
//!
//! Intervals are kept in a copy-on-write ordered index and persisted through a write-ahead
//! log. On top of the bounded, priority-filtered range queries sit two algorithms:
//! [`engine::conflicts`] and [`engine::find_set`].

pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod wal;
