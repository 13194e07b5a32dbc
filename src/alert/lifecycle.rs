/// Monitor lifecycle transitions and threshold evaluation.
///
/// ```text
/// instantiated -> monitoring -> triggered
/// instantiated | monitoring -> completed
/// ```
///
/// # Clock injection
/// All functions accept the cycle instant as a parameter rather than calling
/// `Utc::now()` internally, keeping transitions purely deterministic in
/// tests. The engine owns the order in which these functions are applied
/// within a cycle.

use chrono::{DateTime, Utc};

use crate::analysis::rolling;
use crate::model::{LogEntry, Monitor, MonitorStatus, ROLLING_WINDOW_HOURS};

// ---------------------------------------------------------------------------
// Window transitions
// ---------------------------------------------------------------------------

/// Window-driven status transition for one cycle.
///
/// Returns the status the monitor should move to, or `None` when it stays
/// put. Rules, in order:
///   1. Terminal statuses (`triggered`, `completed`) never transition.
///   2. Past `end_date` the monitor completes, even if it never started
///      monitoring. Completion pre-empts the start transition.
///   3. At or past `start_date` an instantiated monitor starts monitoring.
///
/// A monitor promoted to `monitoring` here is evaluated for rainfall in the
/// same cycle.
pub fn window_transition(monitor: &Monitor, now: DateTime<Utc>) -> Option<MonitorStatus> {
    if monitor.status.is_terminal() {
        return None;
    }
    if now > monitor.end_date {
        return Some(MonitorStatus::Completed);
    }
    if now >= monitor.start_date && monitor.status == MonitorStatus::Instantiated {
        return Some(MonitorStatus::Monitoring);
    }
    None
}

// ---------------------------------------------------------------------------
// Reading accumulation
// ---------------------------------------------------------------------------

/// Outcome of recording one hourly reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Entry appended, both accumulators refreshed.
    Recorded,
    /// The hour was already logged; nothing changed. This guards the manual
    /// trigger path coinciding with the scheduled one within the same hour.
    DuplicateHour,
}

/// Appends an hourly reading and refreshes both accumulators.
///
/// `cycle_hour` must already be truncated to the hour. The same instant is
/// used as the log timestamp and as the rolling-window reference, so every
/// monitor in a sweep is evaluated against the same instant.
pub fn record_reading(
    monitor: &mut Monitor,
    cycle_hour: DateTime<Utc>,
    amount: f64,
) -> RecordOutcome {
    if monitor.has_entry_for(cycle_hour) {
        return RecordOutcome::DuplicateHour;
    }
    monitor.cumulative_rainfall += amount;
    monitor.logs.push(LogEntry {
        date: cycle_hour,
        amount,
        cumulative: rolling::round2(monitor.cumulative_rainfall),
    });
    monitor.current_24h_rainfall =
        rolling::rolling_sum(&monitor.logs, cycle_hour, ROLLING_WINDOW_HOURS);
    RecordOutcome::Recorded
}

// ---------------------------------------------------------------------------
// Trigger evaluation
// ---------------------------------------------------------------------------

/// True when the rolling sum has reached the configured trigger while the
/// monitor is monitoring.
///
/// The crossing is evaluated with `>=`, so a window landing exactly on the
/// trigger fires. Only `monitoring` monitors can trigger; a monitor that
/// already triggered or completed accumulates nothing further.
pub fn should_trigger(monitor: &Monitor) -> bool {
    monitor.status == MonitorStatus::Monitoring
        && monitor.current_24h_rainfall >= monitor.trigger_rainfall
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    /// Window start used across all tests: 2026-03-01 00:00:00 UTC.
    fn window_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    fn monitor(status: MonitorStatus) -> Monitor {
        Monitor {
            id: Uuid::new_v4(),
            region_name: "Kisumu Lakeside".to_string(),
            lat: -0.0917,
            lon: 34.7680,
            radius_km: 10.0,
            location_key: Some("224758".to_string()),
            start_date: window_start(),
            end_date: window_start() + Duration::days(30),
            cumulative_rainfall: 0.0,
            current_24h_rainfall: 0.0,
            trigger_rainfall: 100.0,
            status,
            logs: Vec::new(),
            created_at: window_start() - Duration::days(1),
            updated_at: window_start() - Duration::days(1),
        }
    }

    // --- Window transitions -------------------------------------------------

    #[test]
    fn test_instantiated_before_start_stays_put() {
        let m = monitor(MonitorStatus::Instantiated);
        let before = window_start() - Duration::hours(1);
        assert_eq!(window_transition(&m, before), None);
    }

    #[test]
    fn test_instantiated_at_exact_start_begins_monitoring() {
        // The start boundary is inclusive.
        let m = monitor(MonitorStatus::Instantiated);
        assert_eq!(
            window_transition(&m, window_start()),
            Some(MonitorStatus::Monitoring)
        );
    }

    #[test]
    fn test_monitoring_inside_window_stays_put() {
        let m = monitor(MonitorStatus::Monitoring);
        let mid = window_start() + Duration::days(10);
        assert_eq!(window_transition(&m, mid), None);
    }

    #[test]
    fn test_past_end_date_completes_monitoring_monitor() {
        let m = monitor(MonitorStatus::Monitoring);
        let after = m.end_date + Duration::hours(1);
        assert_eq!(window_transition(&m, after), Some(MonitorStatus::Completed));
    }

    #[test]
    fn test_completion_preempts_start_for_instantiated_monitor() {
        // A monitor whose whole window elapsed without a single evaluation
        // completes directly; it never passes through monitoring.
        let m = monitor(MonitorStatus::Instantiated);
        let after = m.end_date + Duration::hours(1);
        assert_eq!(window_transition(&m, after), Some(MonitorStatus::Completed));
    }

    #[test]
    fn test_exactly_at_end_date_is_still_inside_window() {
        // Completion requires strictly past the end date.
        let m = monitor(MonitorStatus::Monitoring);
        assert_eq!(window_transition(&m, m.end_date), None);
    }

    #[test]
    fn test_terminal_statuses_never_transition() {
        let after_end = window_start() + Duration::days(60);
        let triggered = monitor(MonitorStatus::Triggered);
        let completed = monitor(MonitorStatus::Completed);
        assert_eq!(window_transition(&triggered, after_end), None);
        assert_eq!(window_transition(&completed, after_end), None);
    }

    // --- Reading accumulation -----------------------------------------------

    #[test]
    fn test_record_reading_appends_and_refreshes_accumulators() {
        let mut m = monitor(MonitorStatus::Monitoring);
        let hour = window_start() + Duration::hours(3);

        assert_eq!(record_reading(&mut m, hour, 2.5), RecordOutcome::Recorded);
        assert_eq!(m.logs.len(), 1);
        assert_eq!(m.logs[0].date, hour);
        assert_eq!(m.logs[0].amount, 2.5);
        assert_eq!(m.logs[0].cumulative, 2.5);
        assert_eq!(m.cumulative_rainfall, 2.5);
        assert_eq!(m.current_24h_rainfall, 2.5);
    }

    #[test]
    fn test_record_reading_rejects_duplicate_hour() {
        let mut m = monitor(MonitorStatus::Monitoring);
        let hour = window_start() + Duration::hours(3);

        assert_eq!(record_reading(&mut m, hour, 2.5), RecordOutcome::Recorded);
        assert_eq!(record_reading(&mut m, hour, 2.5), RecordOutcome::DuplicateHour);
        assert_eq!(m.logs.len(), 1);
        assert_eq!(m.cumulative_rainfall, 2.5);
    }

    #[test]
    fn test_cumulative_grows_while_rolling_window_forgets() {
        let mut m = monitor(MonitorStatus::Monitoring);
        for i in 0..30 {
            let hour = window_start() + Duration::hours(i);
            record_reading(&mut m, hour, 1.0);
        }
        // Lifetime total counts every entry; the window only holds the
        // trailing 25 stamps (both bounds inclusive).
        assert_eq!(m.cumulative_rainfall, 30.0);
        assert_eq!(m.current_24h_rainfall, 25.0);
    }

    #[test]
    fn test_zero_amount_reading_is_still_logged() {
        let mut m = monitor(MonitorStatus::Monitoring);
        let hour = window_start() + Duration::hours(1);
        assert_eq!(record_reading(&mut m, hour, 0.0), RecordOutcome::Recorded);
        assert_eq!(m.logs.len(), 1);
        assert_eq!(m.logs[0].amount, 0.0);
        assert_eq!(m.cumulative_rainfall, 0.0);
    }

    // --- Trigger evaluation -------------------------------------------------

    #[test]
    fn test_trigger_fires_at_exact_threshold() {
        let mut m = monitor(MonitorStatus::Monitoring);
        m.current_24h_rainfall = 100.0;
        assert!(should_trigger(&m));
    }

    #[test]
    fn test_trigger_does_not_fire_below_threshold() {
        let mut m = monitor(MonitorStatus::Monitoring);
        m.current_24h_rainfall = 99.99;
        assert!(!should_trigger(&m));
    }

    #[test]
    fn test_only_monitoring_monitors_trigger() {
        for status in [
            MonitorStatus::Instantiated,
            MonitorStatus::Triggered,
            MonitorStatus::Completed,
        ] {
            let mut m = monitor(status);
            m.current_24h_rainfall = 500.0;
            assert!(!should_trigger(&m), "status {} must not trigger", status);
        }
    }
}
