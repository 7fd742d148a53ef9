use std::iter::FusedIterator;
use std::slice;
use std::sync::Arc;

use crate::model::*;

/// Scan direction. `Forward` finds the first match in a window, `Reverse` the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn from_first(first: bool) -> Self {
        if first {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// Whether `next` continues a run whose most recent member is `prev`.
    ///
    /// Forward: `next.start <= prev.end`. Reverse: `next.end >= prev.start`.
    pub fn touches(self, prev: &Interval, next: &Interval) -> bool {
        match self {
            Direction::Forward => next.span.start <= prev.span.end,
            Direction::Reverse => next.span.end >= prev.span.start,
        }
    }
}

/// Lazy single-pass producer of intervals in one direction. Exhaustion is sticky: once
/// `next()` returns `None` it keeps returning `None`.
pub trait IntervalCursor: FusedIterator<Item = Arc<Interval>> {
    fn direction(&self) -> Direction;

    /// Window the cursor was opened over.
    fn window(&self) -> Span;
}

/// Forward scan: ascending `(start, id)`.
pub struct FwdIter<'a> {
    entries: slice::Iter<'a, Arc<Interval>>,
    window: Span,
    max_priority: Priority,
}

impl<'a> FwdIter<'a> {
    /// `entries` must already exclude everything starting at or after `window.end`.
    pub(super) fn new(entries: &'a [Arc<Interval>], window: Span, max_priority: Priority) -> Self {
        Self {
            entries: entries.iter(),
            window,
            max_priority,
        }
    }
}

impl Iterator for FwdIter<'_> {
    type Item = Arc<Interval>;

    fn next(&mut self) -> Option<Self::Item> {
        let window = self.window;
        let max_priority = self.max_priority;
        self.entries
            .find(|i| i.span.end > window.start && i.priority <= max_priority)
            .cloned()
    }
}

impl FusedIterator for FwdIter<'_> {}

impl IntervalCursor for FwdIter<'_> {
    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn window(&self) -> Span {
        self.window
    }
}

/// Reverse scan: descending `(end, id)`, starting from the end of the window.
pub struct RevIter<'a> {
    entries: slice::Iter<'a, Arc<Interval>>,
    window: Span,
    max_priority: Priority,
}

impl<'a> RevIter<'a> {
    /// `entries` must already exclude everything ending at or before `window.start`.
    pub(super) fn new(entries: &'a [Arc<Interval>], window: Span, max_priority: Priority) -> Self {
        Self {
            entries: entries.iter(),
            window,
            max_priority,
        }
    }
}

impl Iterator for RevIter<'_> {
    type Item = Arc<Interval>;

    fn next(&mut self) -> Option<Self::Item> {
        let window = self.window;
        let max_priority = self.max_priority;
        self.entries
            .rfind(|i| i.span.start < window.end && i.priority <= max_priority)
            .cloned()
    }
}

impl FusedIterator for RevIter<'_> {}

impl IntervalCursor for RevIter<'_> {
    fn direction(&self) -> Direction {
        Direction::Reverse
    }

    fn window(&self) -> Span {
        self.window
    }
}

/// Interleaves synthetic free intervals into a cursor for every part of the window that no
/// stored interval covers.
///
/// The inner cursor must be unfiltered: every stored interval counts as coverage, and only
/// those with `priority <= max_priority` are passed through. Free gaps have priority 0 and are
/// clamped to the window.
pub struct GapFill<C> {
    inner: C,
    direction: Direction,
    window: Span,
    max_priority: Priority,
    /// Forward: furthest end seen so far. Reverse: earliest start seen so far.
    frontier: Ms,
    held: Option<Arc<Interval>>,
    finished: bool,
}

impl<C: IntervalCursor> GapFill<C> {
    pub fn new(inner: C, max_priority: Priority) -> Self {
        let direction = inner.direction();
        let window = inner.window();
        let frontier = match direction {
            Direction::Forward => window.start,
            Direction::Reverse => window.end,
        };
        Self {
            inner,
            direction,
            window,
            max_priority,
            frontier,
            held: None,
            finished: window.is_empty(),
        }
    }

    /// Move the frontier past `interval`, returning the uncovered span it skipped over.
    fn advance(&mut self, interval: &Interval) -> Option<Span> {
        match self.direction {
            Direction::Forward => {
                let gap = (interval.span.start > self.frontier)
                    .then(|| Span::new(self.frontier, interval.span.start));
                self.frontier = self.frontier.max(interval.span.end);
                gap
            }
            Direction::Reverse => {
                let gap = (interval.span.end < self.frontier)
                    .then(|| Span::new(interval.span.end, self.frontier));
                self.frontier = self.frontier.min(interval.span.start);
                gap
            }
        }
    }

    fn trailing_gap(&self) -> Option<Span> {
        match self.direction {
            Direction::Forward => (self.frontier < self.window.end)
                .then(|| Span::new(self.frontier, self.window.end)),
            Direction::Reverse => (self.frontier > self.window.start)
                .then(|| Span::new(self.window.start, self.frontier)),
        }
    }

    fn free(&self, gap: Option<Span>) -> Option<Arc<Interval>> {
        gap.filter(|_| FREE_PRIORITY <= self.max_priority)
            .map(|span| Arc::new(Interval::free(span)))
    }
}

impl<C: IntervalCursor> Iterator for GapFill<C> {
    type Item = Arc<Interval>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(held) = self.held.take() {
            return Some(held);
        }
        if self.finished {
            return None;
        }
        while let Some(interval) = self.inner.next() {
            let gap = self.advance(&interval);
            let passes = (interval.priority <= self.max_priority).then_some(interval);
            match (self.free(gap), passes) {
                (Some(free), passes) => {
                    self.held = passes;
                    return Some(free);
                }
                (None, Some(interval)) => return Some(interval),
                (None, None) => continue,
            }
        }
        self.finished = true;
        let tail = self.trailing_gap();
        self.free(tail)
    }
}

impl<C: IntervalCursor> FusedIterator for GapFill<C> {}

impl<C: IntervalCursor> IntervalCursor for GapFill<C> {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn window(&self) -> Span {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::index::IntervalIndex;

    fn index(intervals: &[(IntervalId, Ms, Ms, Priority)]) -> IntervalIndex {
        let mut idx = IntervalIndex::new();
        for &(id, start, end, priority) in intervals {
            idx.insert(Interval::new(id, Span::new(start, end), priority, Vec::new()))
                .unwrap();
        }
        idx
    }

    fn spans(it: impl Iterator<Item = Arc<Interval>>) -> Vec<(Ms, Ms, bool)> {
        it.map(|i| (i.span.start, i.span.end, i.synthetic)).collect()
    }

    #[test]
    fn exhaustion_is_sticky() {
        let idx = index(&[(1, 0, 10, 1.0)]);
        let mut fwd = idx.scan_fwd(Span::new(0, 10), 5.0);
        assert!(fwd.next().is_some());
        assert!(fwd.next().is_none());
        assert!(fwd.next().is_none());

        let mut rev = idx.scan_rev(Span::new(0, 10), 5.0);
        assert!(rev.next().is_some());
        assert!(rev.next().is_none());
        assert!(rev.next().is_none());
    }

    #[test]
    fn touches_is_symmetric() {
        let a = Interval::new(1, Span::new(0, 10), 1.0, Vec::new());
        let b = Interval::new(2, Span::new(10, 20), 1.0, Vec::new());
        let c = Interval::new(3, Span::new(11, 20), 1.0, Vec::new());
        assert!(Direction::Forward.touches(&a, &b));
        assert!(!Direction::Forward.touches(&a, &c));
        assert!(Direction::Reverse.touches(&b, &a));
        assert!(!Direction::Reverse.touches(&c, &a));
    }

    #[test]
    fn from_first_maps_to_direction() {
        assert_eq!(Direction::from_first(true), Direction::Forward);
        assert_eq!(Direction::from_first(false), Direction::Reverse);
    }

    #[test]
    fn gap_fill_forward_inserts_leading_inner_and_trailing_gaps() {
        let idx = index(&[(1, 10, 20, 1.0), (2, 30, 40, 1.0)]);
        let filled = GapFill::new(idx.scan_fwd(Span::new(0, 50), f64::INFINITY), 5.0);
        assert_eq!(
            spans(filled),
            vec![
                (0, 10, true),
                (10, 20, false),
                (20, 30, true),
                (30, 40, false),
                (40, 50, true),
            ]
        );
    }

    #[test]
    fn gap_fill_reverse_mirrors_forward() {
        let idx = index(&[(1, 10, 20, 1.0), (2, 30, 40, 1.0)]);
        let filled = GapFill::new(idx.scan_rev(Span::new(0, 50), f64::INFINITY), 5.0);
        assert_eq!(
            spans(filled),
            vec![
                (40, 50, true),
                (30, 40, false),
                (20, 30, true),
                (10, 20, false),
                (0, 10, true),
            ]
        );
    }

    #[test]
    fn gap_fill_overlaps_leave_no_gap() {
        let idx = index(&[(1, 0, 30, 1.0), (2, 10, 20, 1.0), (3, 25, 40, 1.0)]);
        let filled = GapFill::new(idx.scan_fwd(Span::new(0, 40), f64::INFINITY), 5.0);
        assert!(spans(filled).iter().all(|s| !s.2));
    }

    #[test]
    fn gap_fill_filtered_interval_still_covers() {
        // The 3.0 interval is excluded but must not turn into a free gap.
        let idx = index(&[(1, 0, 10, 1.0), (2, 10, 20, 3.0), (3, 20, 30, 1.0)]);
        let filled = GapFill::new(idx.scan_fwd(Span::new(0, 30), f64::INFINITY), 2.0);
        assert_eq!(spans(filled), vec![(0, 10, false), (20, 30, false)]);
    }

    #[test]
    fn gap_fill_empty_store_yields_whole_window() {
        let idx = IntervalIndex::new();
        let mut filled = GapFill::new(idx.scan_fwd(Span::new(5, 15), f64::INFINITY), 0.0);
        let only = filled.next().unwrap();
        assert!(only.synthetic);
        assert_eq!(only.span, Span::new(5, 15));
        assert!(filled.next().is_none());
        assert!(filled.next().is_none());
    }

    #[test]
    fn gap_fill_negative_max_priority_emits_no_gaps() {
        let idx = index(&[(1, 10, 20, -1.0)]);
        let filled = GapFill::new(idx.scan_fwd(Span::new(0, 30), f64::INFINITY), -0.5);
        assert_eq!(spans(filled), vec![(10, 20, false)]);
    }

    #[test]
    fn gap_fill_empty_window_yields_nothing() {
        let idx = index(&[(1, 10, 20, 1.0)]);
        let mut filled = GapFill::new(idx.scan_fwd(Span::new(30, 30), f64::INFINITY), 5.0);
        assert!(filled.next().is_none());
    }
}
