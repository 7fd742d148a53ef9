use std::sync::Arc;
use std::time::Instant;

use crate::model::*;

use super::conflict::validate_window;
use super::{FwdIter, RevIter, StoreError, Transaction};

fn record_query(op: &'static str, started: Instant) {
    metrics::histogram!(crate::observability::QUERY_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}

impl Transaction<'_> {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, id: IntervalId) -> Option<&Interval> {
        self.index.get(id).map(|i| &**i)
    }

    /// All intervals intersecting `[start, end)` with `priority <= max_priority`, ascending by
    /// `(start, id)`.
    pub fn find_fwd(
        &self,
        start: Ms,
        end: Ms,
        max_priority: Priority,
    ) -> Result<Vec<Interval>, StoreError> {
        let started = Instant::now();
        let found = self
            .find_fwd_iter(start, end, max_priority)?
            .map(Arc::unwrap_or_clone)
            .collect();
        record_query("find_fwd", started);
        Ok(found)
    }

    /// Same filter as [`find_fwd`](Self::find_fwd), descending by `(end, id)`.
    pub fn find_rev(
        &self,
        start: Ms,
        end: Ms,
        max_priority: Priority,
    ) -> Result<Vec<Interval>, StoreError> {
        let started = Instant::now();
        let found = self
            .find_rev_iter(start, end, max_priority)?
            .map(Arc::unwrap_or_clone)
            .collect();
        record_query("find_rev", started);
        Ok(found)
    }

    pub fn find_fwd_iter(
        &self,
        start: Ms,
        end: Ms,
        max_priority: Priority,
    ) -> Result<FwdIter<'_>, StoreError> {
        let window = Span::new(start, end);
        validate_window(&window)?;
        Ok(self.index.scan_fwd(window, max_priority))
    }

    pub fn find_rev_iter(
        &self,
        start: Ms,
        end: Ms,
        max_priority: Priority,
    ) -> Result<RevIter<'_>, StoreError> {
        let window = Span::new(start, end);
        validate_window(&window)?;
        Ok(self.index.scan_rev(window, max_priority))
    }
}
