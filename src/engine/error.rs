use crate::model::{IntervalId, Span};

#[derive(Debug)]
pub enum StoreError {
    InvalidInterval {
        id: IntervalId,
        span: Span,
        reason: &'static str,
    },
    DuplicateId(IntervalId),
    /// Query window outside the valid timestamp range.
    InvalidRange(Span),
    ReadOnly,
    LimitExceeded(&'static str),
    /// Failure from the WAL or its writer task. Never swallowed.
    StorageFault(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidInterval { id, span, reason } => write!(
                f,
                "invalid interval {id} [{}, {}): {reason}",
                span.start, span.end
            ),
            StoreError::DuplicateId(id) => write!(f, "duplicate interval id: {id}"),
            StoreError::InvalidRange(span) => {
                write!(f, "query range [{}, {}) out of bounds", span.start, span.end)
            }
            StoreError::ReadOnly => write!(f, "transaction is read-only"),
            StoreError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            StoreError::StorageFault(e) => write!(f, "storage fault: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
