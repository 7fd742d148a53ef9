use crate::model::Ms;

/// 2000-01-01T00:00:00Z.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;
pub const MAX_INTERVALS_PER_STORE: usize = 1_000_000;
