//! Greedy search for the first contiguous run of intervals whose durations add up to a target.

use std::sync::Arc;

use tracing::trace;

use crate::model::*;

use super::{Direction, GapFill, IntervalCursor, StoreError, Transaction};

/// `Empty → Accumulating → Satisfied`. A contiguity break drops back to a run holding only the
/// breaking candidate.
enum RunState {
    Empty,
    Accumulating {
        members: Vec<Arc<Interval>>,
        total: Ms,
    },
    Satisfied(Vec<Arc<Interval>>),
}

impl RunState {
    fn push(self, candidate: Arc<Interval>, direction: Direction, min_duration: Ms) -> Self {
        let (mut members, mut total) = match self {
            RunState::Empty => (Vec::new(), 0),
            RunState::Accumulating { members, total }
                if members
                    .last()
                    .is_some_and(|prev| direction.touches(prev, &candidate)) =>
            {
                (members, total)
            }
            RunState::Accumulating { members, .. } => {
                trace!(
                    "run of {} broken at interval {} [{}, {})",
                    members.len(),
                    candidate.id,
                    candidate.span.start,
                    candidate.span.end
                );
                (Vec::new(), 0)
            }
            done @ RunState::Satisfied(_) => return done,
        };
        total += candidate.duration_ms();
        members.push(candidate);
        if total >= min_duration {
            RunState::Satisfied(members)
        } else {
            RunState::Accumulating { members, total }
        }
    }
}

/// Pull candidates until a contiguous run reaches `min_duration`.
///
/// Returns the run in discovery order (descending for reverse cursors), or `None` when the
/// cursor runs dry first. Stops at the first satisfying run; it does not look for a shorter one.
pub fn accumulate_run<C: IntervalCursor>(cursor: C, min_duration: Ms) -> Option<Vec<Arc<Interval>>> {
    let direction = cursor.direction();
    let mut state = RunState::Empty;
    for candidate in cursor {
        state = state.push(candidate, direction, min_duration);
        if let RunState::Satisfied(members) = state {
            return Some(members);
        }
    }
    None
}

fn finish(run: Option<Vec<Arc<Interval>>>) -> Option<Vec<Interval>> {
    let outcome = if run.is_some() { "found" } else { "none" };
    metrics::counter!(crate::observability::FIND_SET_TOTAL, "outcome" => outcome).increment(1);
    run.map(|members| members.into_iter().map(Arc::unwrap_or_clone).collect())
}

/// First (forward) or last (reverse) contiguous run of stored intervals in
/// `[min_start, max_end)` with `priority <= max_priority` whose summed duration reaches
/// `min_duration`.
///
/// Only stored intervals are candidates; a gap between them breaks the run. `Ok(None)` means
/// no run qualifies.
pub fn find_set(
    tx: &Transaction<'_>,
    direction: Direction,
    min_start: Ms,
    max_end: Ms,
    min_duration: Ms,
    max_priority: Priority,
) -> Result<Option<Vec<Interval>>, StoreError> {
    let run = match direction {
        Direction::Forward => {
            accumulate_run(tx.find_fwd_iter(min_start, max_end, max_priority)?, min_duration)
        }
        Direction::Reverse => {
            accumulate_run(tx.find_rev_iter(min_start, max_end, max_priority)?, min_duration)
        }
    };
    Ok(finish(run))
}

/// Like [`find_set`], but uncovered stretches of the window count as synthetic free intervals
/// (`synthetic == true`, priority 0) that can join or bridge a run.
pub fn find_set_with_gaps(
    tx: &Transaction<'_>,
    direction: Direction,
    min_start: Ms,
    max_end: Ms,
    min_duration: Ms,
    max_priority: Priority,
) -> Result<Option<Vec<Interval>>, StoreError> {
    let run = match direction {
        Direction::Forward => accumulate_run(
            GapFill::new(tx.find_fwd_iter(min_start, max_end, f64::INFINITY)?, max_priority),
            min_duration,
        ),
        Direction::Reverse => accumulate_run(
            GapFill::new(tx.find_rev_iter(min_start, max_end, f64::INFINITY)?, max_priority),
            min_duration,
        ),
    };
    Ok(finish(run))
}
