//! Staleness checks for cached listings.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch for `time` (0 for times before it).
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Check if an entry written at `stored_at_ms` is stale at `now`.
///
/// Returns true if the entry is at least `max_age` old. Timestamps from the
/// future (clock skew, hand-edited stores) count as stale too.
pub fn is_stale(stored_at_ms: u64, max_age: Duration, now: SystemTime) -> bool {
    let now_ms = unix_millis(now);
    match now_ms.checked_sub(stored_at_ms) {
        Some(age_ms) => age_ms >= max_age.as_millis() as u64,
        None => true,
    }
}
