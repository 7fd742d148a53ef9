use std::collections::HashMap;
use std::sync::Arc;

use crate::model::*;

use super::iter::{FwdIter, RevIter};
use super::StoreError;

/// Immutable-once-published ordered index. Writers clone it (copy-on-write) and publish the
/// clone on commit; entries are shared `Arc`s so the clone only copies pointers.
///
/// - `by_start` is sorted by `(start, id)` and drives forward scans.
/// - `by_end` is sorted by `(end, id)` and drives reverse scans.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    by_start: Vec<Arc<Interval>>,
    by_end: Vec<Arc<Interval>>,
    by_id: HashMap<IntervalId, Arc<Interval>>,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: IntervalId) -> Option<&Arc<Interval>> {
        self.by_id.get(&id)
    }

    /// All intervals in forward order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Interval>> {
        self.by_start.iter()
    }

    /// Insert keeping both orders. Duplicate ids are rejected and leave the index unchanged.
    pub fn insert(&mut self, interval: Interval) -> Result<(), StoreError> {
        if self.by_id.contains_key(&interval.id) {
            return Err(StoreError::DuplicateId(interval.id));
        }
        let key = (interval.span.start, interval.id);
        let pos = self
            .by_start
            .partition_point(|i| (i.span.start, i.id) < key);
        let end_key = (interval.span.end, interval.id);
        let end_pos = self
            .by_end
            .partition_point(|i| (i.span.end, i.id) < end_key);

        let interval = Arc::new(interval);
        self.by_start.insert(pos, interval.clone());
        self.by_end.insert(end_pos, interval.clone());
        self.by_id.insert(interval.id, interval);
        Ok(())
    }

    /// Ascending `(start, id)` over intervals intersecting `window` with `priority <= max_priority`.
    pub fn scan_fwd(&self, window: Span, max_priority: Priority) -> FwdIter<'_> {
        // Everything at index >= right_bound starts at or after window.end → can't overlap.
        let right_bound = if window.is_empty() {
            0
        } else {
            self.by_start.partition_point(|i| i.span.start < window.end)
        };
        FwdIter::new(&self.by_start[..right_bound], window, max_priority)
    }

    /// Descending `(end, id)` over intervals intersecting `window` with `priority <= max_priority`.
    pub fn scan_rev(&self, window: Span, max_priority: Priority) -> RevIter<'_> {
        // Everything below left_bound ends at or before window.start → can't overlap.
        let left_bound = if window.is_empty() {
            self.by_end.len()
        } else {
            self.by_end.partition_point(|i| i.span.end <= window.start)
        };
        RevIter::new(&self.by_end[left_bound..], window, max_priority)
    }
}
