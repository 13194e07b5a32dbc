/// Trailing rainfall window computation.
///
/// The monitor log is append-only and never purged. The rolling sum is
/// recomputed from scratch every cycle by filtering on entry timestamps;
/// entries that age out of the window simply stop counting. At hourly
/// resolution a linear rescan is cheap even for long-lived monitors.

use chrono::{DateTime, Duration, Utc};

use crate::model::LogEntry;

/// Rounds a millimeter value to two decimal places.
///
/// Applied to every figure that accumulates across cycles, so long-running
/// monitors do not drift through repeated float addition.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sums `amount` over log entries whose timestamp falls within
/// `[now - window_hours, now]`, inclusive on both ends.
///
/// Entries stamped after `now` are excluded as well; they cannot occur in
/// normal operation because the engine stamps entries with the cycle hour.
/// An empty log sums to 0.0. The log is not mutated.
pub fn rolling_sum(log: &[LogEntry], now: DateTime<Utc>, window_hours: i64) -> f64 {
    let window_start = now - Duration::hours(window_hours);
    let sum: f64 = log
        .iter()
        .filter(|entry| entry.date >= window_start && entry.date <= now)
        .map(|entry| entry.amount)
        .sum();
    round2(sum)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
