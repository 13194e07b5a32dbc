/// Core data types for the rainfall monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and no collaborator wiring, only types, their persisted
/// string forms, and the validity rules enforced at the creation boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Domain constants
// ---------------------------------------------------------------------------

/// Monitoring radius in kilometers applied when a creation request omits one.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Length of the trailing rainfall window, in hours.
pub const ROLLING_WINDOW_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Lifecycle status
// ---------------------------------------------------------------------------

/// Lifecycle states of a monitor.
///
/// ```text
/// instantiated -> monitoring -> triggered
/// instantiated | monitoring -> completed
/// ```
///
/// `Triggered` and `Completed` are terminal. The enum is closed so states
/// like "triggered then un-triggered" cannot be expressed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Instantiated,
    Monitoring,
    Triggered,
    Completed,
}

impl MonitorStatus {
    /// Persisted string form, also used in the webhook payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Instantiated => "instantiated",
            MonitorStatus::Monitoring => "monitoring",
            MonitorStatus::Triggered => "triggered",
            MonitorStatus::Completed => "completed",
        }
    }

    /// Terminal statuses are never left once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MonitorStatus::Triggered | MonitorStatus::Completed)
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string read back from storage that matches no known state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown monitor status: '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl std::str::FromStr for MonitorStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<MonitorStatus, UnknownStatus> {
        match s {
            "instantiated" => Ok(MonitorStatus::Instantiated),
            "monitoring" => Ok(MonitorStatus::Monitoring),
            "triggered" => Ok(MonitorStatus::Triggered),
            "completed" => Ok(MonitorStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// One hourly rainfall observation appended to a monitor's log.
///
/// `date` is truncated to the hour before appending, so a single hour can
/// never produce two entries. `cumulative` is the lifetime total at the time
/// the entry was written, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub cumulative: f64,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// A tracked geographic region with a monitoring window and a rainfall
/// trigger.
///
/// Created once from a [`CreateMonitorRequest`] and mutated exclusively by
/// the evaluation engine afterwards. The log is append-only and retained
/// indefinitely; entries that age out of the rolling window stay in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: Uuid,
    pub region_name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
    /// Provider location handle resolved once at creation. `None` when
    /// resolution never happened.
    pub location_key: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Lifetime rainfall total in millimeters. Non-decreasing while the
    /// monitor is in `Monitoring`.
    pub cumulative_rainfall: f64,
    /// Trailing 24-hour rainfall in millimeters, recomputed each cycle.
    /// Not monotonic: it falls as old entries age out of the window.
    pub current_24h_rainfall: f64,
    pub trigger_rainfall: f64,
    pub status: MonitorStatus,
    pub logs: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Monitor {
    /// Builds a new monitor in `Instantiated` status from a validated
    /// creation request.
    pub fn from_request(
        req: CreateMonitorRequest,
        location_key: Option<String>,
        now: DateTime<Utc>,
    ) -> Monitor {
        Monitor {
            id: Uuid::new_v4(),
            region_name: req.region_name,
            lat: req.lat,
            lon: req.lon,
            radius_km: req.radius_km.unwrap_or(DEFAULT_RADIUS_KM),
            location_key,
            start_date: req.start_date,
            end_date: req.end_date,
            cumulative_rainfall: 0.0,
            current_24h_rainfall: 0.0,
            trigger_rainfall: req.trigger_rainfall,
            status: MonitorStatus::Instantiated,
            logs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True if the log already holds an entry for the given hour.
    ///
    /// The log is appended in chronological order, so only the most recent
    /// entry needs checking.
    pub fn has_entry_for(&self, hour: DateTime<Utc>) -> bool {
        self.logs.last().map(|e| e.date == hour).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Creation boundary
// ---------------------------------------------------------------------------

/// Parameters accepted when a new monitor is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMonitorRequest {
    pub region_name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub radius_km: Option<f64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub trigger_rainfall: f64,
}

impl CreateMonitorRequest {
    /// Rejects malformed requests before any collaborator is contacted.
    /// A request that fails here never becomes a monitor.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.region_name.trim().is_empty() {
            return Err(ValidationError::EmptyRegionName);
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ValidationError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(ValidationError::LongitudeOutOfRange(self.lon));
        }
        if let Some(radius) = self.radius_km {
            if radius.is_nan() || radius <= 0.0 {
                return Err(ValidationError::NonPositiveRadius(radius));
            }
        }
        if self.trigger_rainfall.is_nan() || self.trigger_rainfall <= 0.0 {
            return Err(ValidationError::NonPositiveTrigger(self.trigger_rainfall));
        }
        if self.end_date <= self.start_date {
            return Err(ValidationError::WindowEndsBeforeStart);
        }
        Ok(())
    }
}

/// Reasons a creation request is rejected at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyRegionName,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    NonPositiveRadius(f64),
    NonPositiveTrigger(f64),
    WindowEndsBeforeStart,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyRegionName => write!(f, "region name must not be empty"),
            ValidationError::LatitudeOutOfRange(lat) => {
                write!(f, "latitude {} outside [-90, 90]", lat)
            }
            ValidationError::LongitudeOutOfRange(lon) => {
                write!(f, "longitude {} outside [-180, 180]", lon)
            }
            ValidationError::NonPositiveRadius(r) => {
                write!(f, "radius must be positive, got {} km", r)
            }
            ValidationError::NonPositiveTrigger(t) => {
                write!(f, "trigger rainfall must be positive, got {} mm", t)
            }
            ValidationError::WindowEndsBeforeStart => {
                write!(f, "end date must be strictly after start date")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
