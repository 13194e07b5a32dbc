/// Webhook delivery of monitor trigger events.
///
/// When a monitor's rolling sum first crosses its trigger, one event is
/// posted to the configured endpoint. Delivery is best-effort with a single
/// attempt: a failed POST is logged and the triggered status stands, since
/// the lifecycle transition is not transactional with notification.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::engine::TriggerNotifier;
use crate::logging::{self, Component};
use crate::model::{Monitor, MonitorStatus};

// ---------------------------------------------------------------------------
// Event payload
// ---------------------------------------------------------------------------

/// Monitor fields carried in the trigger payload.
///
/// Field names serialize in camelCase to match the wire contract consumed
/// by downstream automation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub id: Uuid,
    pub region_name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
    pub location_key: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub trigger_rainfall: f64,
    pub current_24h_rainfall: f64,
    pub cumulative_rainfall: f64,
    pub status: MonitorStatus,
    pub triggered_at: DateTime<Utc>,
}

/// Event delivered when a monitor's rolling sum crosses its trigger.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerEvent {
    pub event: &'static str,
    pub timestamp: DateTime<Utc>,
    pub monitor: MonitorSnapshot,
}

impl TriggerEvent {
    /// Snapshots a freshly triggered monitor at the given cycle instant.
    pub fn new(monitor: &Monitor, at: DateTime<Utc>) -> TriggerEvent {
        TriggerEvent {
            event: "monitor_triggered",
            timestamp: at,
            monitor: MonitorSnapshot {
                id: monitor.id,
                region_name: monitor.region_name.clone(),
                lat: monitor.lat,
                lon: monitor.lon,
                radius_km: monitor.radius_km,
                location_key: monitor.location_key.clone(),
                start_date: monitor.start_date,
                end_date: monitor.end_date,
                trigger_rainfall: monitor.trigger_rainfall,
                current_24h_rainfall: monitor.current_24h_rainfall,
                cumulative_rainfall: monitor.cumulative_rainfall,
                status: monitor.status,
                triggered_at: at,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise delivering a trigger event.
#[derive(Debug, PartialEq)]
pub enum NotifyError {
    /// Non-2xx response from the webhook endpoint.
    HttpError(u16),
    /// The request never completed (connect failure, timeout).
    RequestFailed(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::HttpError(code) => write!(f, "HTTP error: {}", code),
            NotifyError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

// ---------------------------------------------------------------------------
// Webhook sender
// ---------------------------------------------------------------------------

/// Posts trigger events to a webhook-style endpoint as JSON.
pub struct WebhookNotifier {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookNotifier {
    /// The timeout bounds the whole request so a slow endpoint cannot stall
    /// the evaluation sweep.
    pub fn new(url: &str, timeout: Duration) -> Result<WebhookNotifier, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;
        Ok(WebhookNotifier {
            client,
            url: url.to_string(),
        })
    }
}

impl TriggerNotifier for WebhookNotifier {
    fn notify_triggered(&self, event: &TriggerEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::HttpError(response.status().as_u16()));
        }

        logging::info(
            Component::Webhook,
            Some(&event.monitor.region_name),
            &format!("trigger notification delivered ({})", response.status().as_u16()),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn triggered_monitor() -> Monitor {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        Monitor {
            id: Uuid::new_v4(),
            region_name: "Mombasa Coast".to_string(),
            lat: -4.0435,
            lon: 39.6682,
            radius_km: 25.0,
            location_key: Some("224475".to_string()),
            start_date: start,
            end_date: start + chrono::Duration::days(14),
            cumulative_rainfall: 130.4,
            current_24h_rainfall: 101.2,
            trigger_rainfall: 100.0,
            status: MonitorStatus::Triggered,
            logs: Vec::new(),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_payload_wire_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
        let monitor = triggered_monitor();
        let event = TriggerEvent::new(&monitor, at);

        let value = serde_json::to_value(&event).expect("payload must serialize");
        assert_eq!(value["event"], "monitor_triggered");
        assert_eq!(value["monitor"]["regionName"], "Mombasa Coast");
        assert_eq!(value["monitor"]["radiusKm"], 25.0);
        assert_eq!(value["monitor"]["locationKey"], "224475");
        assert_eq!(value["monitor"]["triggerRainfall"], 100.0);
        assert_eq!(value["monitor"]["current24hRainfall"], 101.2);
        assert_eq!(value["monitor"]["cumulativeRainfall"], 130.4);
        assert_eq!(value["monitor"]["status"], "triggered");
        assert_eq!(value["monitor"]["id"], monitor.id.to_string());
        assert!(value["monitor"]["startDate"].is_string());
        assert!(value["monitor"]["endDate"].is_string());
        assert!(value["monitor"]["triggeredAt"].is_string());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_snapshot_carries_rolling_sum_at_crossing() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
        let event = TriggerEvent::new(&triggered_monitor(), at);
        assert_eq!(event.monitor.current_24h_rainfall, 101.2);
        assert_eq!(event.monitor.triggered_at, at);
        assert_eq!(event.timestamp, at);
    }

    #[test]
    fn test_notify_error_display() {
        assert_eq!(NotifyError::HttpError(500).to_string(), "HTTP error: 500");
        assert!(
            NotifyError::RequestFailed("timed out".to_string())
                .to_string()
                .contains("timed out")
        );
    }
}
