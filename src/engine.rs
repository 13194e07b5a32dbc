/// Evaluation cycle engine.
///
/// Owns the hourly sweep over all non-completed monitors: lifecycle
/// transitions, reading capture, rolling-window evaluation, trigger
/// notification, and persistence. The external collaborators sit behind
/// small traits so a full cycle runs deterministically against in-memory
/// fakes in tests.

use chrono::{DateTime, Duration, DurationRound, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

use crate::alert::lifecycle::{self, RecordOutcome};
use crate::alert::webhook::{NotifyError, TriggerEvent};
use crate::logging::{self, Component};
use crate::model::{CreateMonitorRequest, Monitor, MonitorStatus, ValidationError};
use crate::store::StoreError;

// ---------------------------------------------------------------------------
// Collaborator contracts
// ---------------------------------------------------------------------------

/// Durable monitor storage.
pub trait MonitorStore {
    /// Every monitor that may still change, in stable creation order.
    fn load_active(&mut self) -> Result<Vec<Monitor>, StoreError>;

    fn insert(&mut self, monitor: &Monitor) -> Result<(), StoreError>;

    /// Full-record replace keyed by the monitor id.
    fn save(&mut self, monitor: &Monitor) -> Result<(), StoreError>;
}

/// Hourly precipitation provider.
///
/// Both operations degrade internally rather than fail: resolution falls
/// back to a placeholder handle and readings fall back to 0.0 mm. The
/// engine never sees a provider error.
pub trait ReadingSource {
    fn resolve_location(&self, lat: f64, lon: f64) -> String;

    /// Past-hour rainfall in millimeters, always >= 0. An absent key
    /// degrades to 0.0.
    fn hourly_rainfall(&self, location_key: Option<&str>) -> f64;
}

impl<T: ReadingSource + ?Sized> ReadingSource for Box<T> {
    fn resolve_location(&self, lat: f64, lon: f64) -> String {
        (**self).resolve_location(lat, lon)
    }

    fn hourly_rainfall(&self, location_key: Option<&str>) -> f64 {
        (**self).hourly_rainfall(location_key)
    }
}

/// Trigger event sink. Delivery is attempted once per crossing; the caller
/// logs a failure and moves on.
pub trait TriggerNotifier {
    fn notify_triggered(&self, event: &TriggerEvent) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// Creation boundary errors
// ---------------------------------------------------------------------------

/// Errors from the monitor creation boundary.
#[derive(Debug)]
pub enum CreateMonitorError {
    Invalid(ValidationError),
    Store(StoreError),
}

impl fmt::Display for CreateMonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateMonitorError::Invalid(e) => write!(f, "invalid creation request: {}", e),
            CreateMonitorError::Store(e) => write!(f, "failed to persist new monitor: {}", e),
        }
    }
}

impl std::error::Error for CreateMonitorError {}

impl From<ValidationError> for CreateMonitorError {
    fn from(e: ValidationError) -> CreateMonitorError {
        CreateMonitorError::Invalid(e)
    }
}

impl From<StoreError> for CreateMonitorError {
    fn from(e: StoreError) -> CreateMonitorError {
        CreateMonitorError::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Cycle timestamp
// ---------------------------------------------------------------------------

/// Truncates an instant to the top of its hour.
///
/// One truncated instant is computed at the start of a sweep and used for
/// every log entry and window comparison in it, so all monitors in the
/// sweep are evaluated against the same instant.
pub fn cycle_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::hours(1)).unwrap_or(now)
}

/// Counters for one sweep, reported through the cycle summary log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub evaluated: usize,
    pub updated: usize,
    pub triggered: usize,
    pub completed: usize,
    pub persist_failures: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine<S, R, N> {
    store: S,
    source: R,
    notifier: N,
}

impl<S: MonitorStore, R: ReadingSource, N: TriggerNotifier> Engine<S, R, N> {
    pub fn new(store: S, source: R, notifier: N) -> Engine<S, R, N> {
        Engine {
            store,
            source,
            notifier,
        }
    }

    /// Creation boundary: validates the request, resolves the provider
    /// location handle (best effort), and persists the new monitor in
    /// `instantiated` status. The first evaluation happens on the next
    /// cycle whose instant falls inside the monitoring window.
    pub fn create_monitor(
        &mut self,
        req: CreateMonitorRequest,
        now: DateTime<Utc>,
    ) -> Result<Monitor, CreateMonitorError> {
        req.validate()?;
        let location_key = self.source.resolve_location(req.lat, req.lon);
        let monitor = Monitor::from_request(req, Some(location_key), now);
        self.store.insert(&monitor)?;
        logging::info(
            Component::Engine,
            Some(&monitor.region_name),
            &format!("monitor created, window {} to {}", monitor.start_date, monitor.end_date),
        );
        Ok(monitor)
    }

    /// Runs one evaluation cycle against the wall clock.
    pub fn run_cycle(&mut self) -> Result<CycleReport, StoreError> {
        self.run_cycle_at(Utc::now())
    }

    /// Runs one evaluation cycle against an explicit instant.
    ///
    /// Only the initial load can fail the cycle. Every per-monitor error is
    /// contained: a failed save is logged, the in-memory mutation is
    /// discarded, and the sweep moves on, leaving that monitor to be
    /// retried naturally next cycle.
    pub fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport, StoreError> {
        let hour = cycle_hour(now);
        let monitors = self.store.load_active()?;

        let mut report = CycleReport {
            evaluated: monitors.len(),
            ..CycleReport::default()
        };

        for mut monitor in monitors {
            let mut changed = false;

            if let Some(next) = lifecycle::window_transition(&monitor, hour) {
                logging::info(
                    Component::Engine,
                    Some(&monitor.region_name),
                    &format!("status {} -> {}", monitor.status, next),
                );
                monitor.status = next;
                changed = true;
                if next == MonitorStatus::Completed {
                    report.completed += 1;
                }
            }

            if monitor.status == MonitorStatus::Monitoring {
                changed |= self.capture_reading(&mut monitor, hour, &mut report);
            }

            if changed {
                monitor.updated_at = hour;
                match self.store.save(&monitor) {
                    Ok(()) => report.updated += 1,
                    Err(e) => {
                        report.persist_failures += 1;
                        logging::error(
                            Component::Database,
                            Some(&monitor.region_name),
                            &format!("save failed, monitor retries next cycle: {}", e),
                        );
                    }
                }
            }
        }

        logging::log_cycle_summary(
            hour,
            report.evaluated,
            report.updated,
            report.triggered,
            report.persist_failures,
        );
        Ok(report)
    }

    /// Fetches and records this hour's reading, then evaluates the trigger.
    /// Returns whether the monitor changed. An hour that is already logged
    /// (manual trigger racing the schedule) changes nothing.
    fn capture_reading(
        &mut self,
        monitor: &mut Monitor,
        hour: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> bool {
        let amount = self.source.hourly_rainfall(monitor.location_key.as_deref());
        match lifecycle::record_reading(monitor, hour, amount) {
            RecordOutcome::DuplicateHour => return false,
            RecordOutcome::Recorded => {}
        }

        logging::info(
            Component::Engine,
            Some(&monitor.region_name),
            &format!(
                "+{:.1} mm, 24h total {:.1} mm (cumulative {:.1} mm)",
                amount, monitor.current_24h_rainfall, monitor.cumulative_rainfall
            ),
        );

        if lifecycle::should_trigger(monitor) {
            monitor.status = MonitorStatus::Triggered;
            report.triggered += 1;
            logging::warn(
                Component::Engine,
                Some(&monitor.region_name),
                &format!(
                    "TRIGGERED: 24h rainfall {:.1} mm reached trigger {:.1} mm",
                    monitor.current_24h_rainfall, monitor.trigger_rainfall
                ),
            );

            let event = TriggerEvent::new(monitor, hour);
            if let Err(e) = self.notifier.notify_triggered(&event) {
                logging::log_webhook_failure(&monitor.region_name, &e);
            }
        }

        true
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Requests a graceful stop: the in-flight cycle finishes its current
/// monitor sweep, then no new cycle starts.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Hourly driver for an engine.
///
/// The engine sits behind a mutex shared by the timer path and the manual
/// trigger path, so two sweeps can never run concurrently. If a manual
/// sweep lands in the same hour as a scheduled one, the per-hour duplicate
/// guard in the log makes the second invocation a no-op.
pub struct Scheduler<S, R, N> {
    engine: Arc<Mutex<Engine<S, R, N>>>,
    stop: Arc<AtomicBool>,
}

impl<S: MonitorStore, R: ReadingSource, N: TriggerNotifier> Scheduler<S, R, N> {
    pub fn new(engine: Engine<S, R, N>) -> Scheduler<S, R, N> {
        Scheduler {
            engine: Arc::new(Mutex::new(engine)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    /// Runs one cycle immediately, contending on the same run lock as the
    /// timer path. Intended for diagnostics and operational re-runs.
    pub fn trigger_now(&self) -> Result<CycleReport, StoreError> {
        let mut engine = self.engine.lock().unwrap_or_else(|e| e.into_inner());
        engine.run_cycle()
    }

    /// Blocks until stopped, running one cycle at the top of every hour.
    /// A failed cycle is logged and the cadence continues.
    pub fn run(&self) {
        logging::info(Component::Engine, None, "scheduler started, hourly cadence");
        while !self.stop.load(Ordering::SeqCst) {
            self.sleep_until_next_hour();
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            let mut engine = self.engine.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = engine.run_cycle() {
                logging::error(Component::Engine, None, &format!("cycle aborted: {}", e));
            }
        }
        logging::info(Component::Engine, None, "scheduler stopped");
    }

    /// Sleeps in one-second slices so a stop request is honored promptly.
    fn sleep_until_next_hour(&self) {
        let target = cycle_hour(Utc::now()) + Duration::hours(1);
        while !self.stop.load(Ordering::SeqCst) {
            let remaining = target - Utc::now();
            if remaining <= Duration::zero() {
                return;
            }
            let slice = remaining.min(Duration::seconds(1));
            thread::sleep(slice.to_std().unwrap_or(StdDuration::from_secs(1)));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cycle_hour_truncates_minutes_and_seconds() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 14, 37, 52).unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        assert_eq!(cycle_hour(now), expected);
    }

    #[test]
    fn test_cycle_hour_is_idempotent_on_the_hour() {
        let on_the_hour = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        assert_eq!(cycle_hour(on_the_hour), on_the_hour);
    }

    #[test]
    fn test_two_instants_in_same_hour_share_a_cycle_timestamp() {
        let early = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 1).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 2, 14, 59, 59).unwrap();
        assert_eq!(cycle_hour(early), cycle_hour(late));
    }

    #[test]
    fn test_stop_handle_is_shared() {
        let flag = Arc::new(AtomicBool::new(false));
        let handle = StopHandle(flag.clone());
        let clone = handle.clone();
        assert!(!handle.is_stopped());
        clone.request_stop();
        assert!(handle.is_stopped());
        assert!(flag.load(Ordering::SeqCst));
    }
}
