//! Re-evaluation timing aligned to forecast granularity

use chrono::{DateTime, Timelike, Utc};
use std::time::Duration;

/// Granularity used when no forecast sample is available
pub const DEFAULT_GRANULARITY_MINUTES: u32 = 5;

/// Computes the delay until the next evaluation boundary
pub struct WakeScheduler;

impl WakeScheduler {
    /// Delay until the next minute mark past the hour that is a multiple of
    /// `granularity_minutes`.
    ///
    /// Never zero: an instant sitting exactly on a boundary waits a full
    /// granularity.
    pub fn next_tick(now: DateTime<Utc>, granularity_minutes: u32) -> Duration {
        let granularity = u64::from(granularity_minutes.max(1));
        let period = Duration::from_secs(granularity * 60);

        let minutes_into = u64::from(now.minute()) % granularity;
        let elapsed = Duration::from_secs(minutes_into * 60 + u64::from(now.second()))
            + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));

        if elapsed.is_zero() {
            period
        } else {
            period - elapsed
        }
    }
}
