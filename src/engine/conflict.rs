use crate::limits::*;
use crate::model::*;

use super::{StoreError, Transaction};

pub(crate) fn validate_interval(interval: &Interval) -> Result<(), StoreError> {
    let invalid = |reason| StoreError::InvalidInterval {
        id: interval.id,
        span: interval.span,
        reason,
    };
    if interval.span.is_empty() {
        return Err(invalid("start must be before end"));
    }
    if interval.span.start < MIN_VALID_TIMESTAMP_MS || interval.span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(invalid("timestamp out of range"));
    }
    if interval.priority.is_nan() {
        return Err(invalid("priority is NaN"));
    }
    if interval.payload.len() > MAX_PAYLOAD_LEN {
        return Err(StoreError::LimitExceeded("payload too large"));
    }
    Ok(())
}

/// An empty window is fine (empty answer) wherever it lies; a non-empty one must stay inside
/// the timestamp range.
pub(crate) fn validate_window(window: &Span) -> Result<(), StoreError> {
    if window.is_empty() {
        return Ok(());
    }
    let in_range = |t: Ms| (MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&t);
    if !in_range(window.start) || !in_range(window.end) {
        return Err(StoreError::InvalidRange(*window));
    }
    Ok(())
}

/// Does `candidate` overlap any non-free interval visible to `tx`?
///
/// Stops at the first occupant found. Free intervals (priority 0) never conflict.
pub fn conflicts(tx: &Transaction<'_>, candidate: &Interval) -> Result<bool, StoreError> {
    let mut iter = tx.find_fwd_iter(candidate.span.start, candidate.span.end, f64::INFINITY)?;
    let hit = iter.find(|existing| !existing.is_free());
    if let Some(existing) = &hit {
        tracing::debug!("interval {} conflicts with {}", candidate.id, existing.id);
    }
    let label = if hit.is_some() { "conflict" } else { "clear" };
    metrics::counter!(crate::observability::CONFLICT_CHECKS_TOTAL, "result" => label).increment(1);
    Ok(hit.is_some())
}
