//! Engine constants. All time values in seconds.

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Seconds in one week.
pub const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;

/// Seconds in a 365-day year.
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Number of halvings after which any [`Amount`](crate::types::Amount) has
/// shifted down to zero. `V >> k` is defined as 0 for `k >= MAX_HALVINGS`.
pub const MAX_HALVINGS: u64 = u128::BITS as u64;

/// Byte length of an [`Address`](crate::types::Address).
pub const ADDRESS_LEN: usize = 20;
