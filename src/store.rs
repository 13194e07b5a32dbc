/// Postgres-backed monitor repository.
///
/// Monitor records live in a single `monitors` table with the hourly log as
/// a JSONB column; at one entry per monitor per hour, the log stays small
/// enough that full-record replace is the simplest correct write model.
/// Row decoding is strict: an unknown status string or malformed log column
/// surfaces as corruption instead of silently re-entering the lifecycle.

use postgres::{Client, NoTls, Row};
use std::fmt;

use crate::engine::MonitorStore;
use crate::model::{LogEntry, Monitor, MonitorStatus};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise reading or writing monitor records.
#[derive(Debug)]
pub enum StoreError {
    /// Could not establish the database connection.
    Connection(String),
    /// A query or statement failed.
    Query(String),
    /// A row decoded into something that is not a valid monitor.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "database connection error: {}", msg),
            StoreError::Query(msg) => write!(f, "database query error: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "corrupt monitor record: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<postgres::Error> for StoreError {
    fn from(e: postgres::Error) -> StoreError {
        StoreError::Query(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS monitors (
    id                    UUID PRIMARY KEY,
    region_name           TEXT NOT NULL,
    lat                   DOUBLE PRECISION NOT NULL,
    lon                   DOUBLE PRECISION NOT NULL,
    radius_km             DOUBLE PRECISION NOT NULL,
    location_key          TEXT,
    start_date            TIMESTAMPTZ NOT NULL,
    end_date              TIMESTAMPTZ NOT NULL,
    cumulative_rainfall   DOUBLE PRECISION NOT NULL DEFAULT 0,
    current_24h_rainfall  DOUBLE PRECISION NOT NULL DEFAULT 0,
    trigger_rainfall      DOUBLE PRECISION NOT NULL,
    status                TEXT NOT NULL,
    logs                  JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at            TIMESTAMPTZ NOT NULL,
    updated_at            TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS monitors_status_idx ON monitors (status);
";

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

pub struct PgMonitorStore {
    client: Client,
}

impl PgMonitorStore {
    pub fn connect(url: &str) -> Result<PgMonitorStore, StoreError> {
        let client = Client::connect(url, NoTls).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(PgMonitorStore { client })
    }

    /// Creates the monitors table when absent. Safe to run on every start.
    pub fn init_schema(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute(SCHEMA)?;
        Ok(())
    }

    fn row_to_monitor(row: &Row) -> Result<Monitor, StoreError> {
        let status_str: String = row.get("status");
        let status = status_str
            .parse::<MonitorStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let logs_value: serde_json::Value = row.get("logs");
        let logs: Vec<LogEntry> = serde_json::from_value(logs_value)
            .map_err(|e| StoreError::Corrupt(format!("bad log entries: {}", e)))?;

        Ok(Monitor {
            id: row.get("id"),
            region_name: row.get("region_name"),
            lat: row.get("lat"),
            lon: row.get("lon"),
            radius_km: row.get("radius_km"),
            location_key: row.get("location_key"),
            start_date: row.get("start_date"),
            end_date: row.get("end_date"),
            cumulative_rainfall: row.get("cumulative_rainfall"),
            current_24h_rainfall: row.get("current_24h_rainfall"),
            trigger_rainfall: row.get("trigger_rainfall"),
            status,
            logs,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn logs_to_json(monitor: &Monitor) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(&monitor.logs)
            .map_err(|e| StoreError::Query(format!("log serialization failed: {}", e)))
    }
}

impl MonitorStore for PgMonitorStore {
    fn load_active(&mut self) -> Result<Vec<Monitor>, StoreError> {
        let completed = MonitorStatus::Completed.as_str();
        let rows = self.client.query(
            "SELECT id, region_name, lat, lon, radius_km, location_key,
                    start_date, end_date, cumulative_rainfall, current_24h_rainfall,
                    trigger_rainfall, status, logs, created_at, updated_at
             FROM monitors
             WHERE status <> $1
             ORDER BY created_at",
            &[&completed],
        )?;
        rows.iter().map(Self::row_to_monitor).collect()
    }

    fn insert(&mut self, monitor: &Monitor) -> Result<(), StoreError> {
        let logs = Self::logs_to_json(monitor)?;
        self.client.execute(
            "INSERT INTO monitors (
                 id, region_name, lat, lon, radius_km, location_key,
                 start_date, end_date, cumulative_rainfall, current_24h_rainfall,
                 trigger_rainfall, status, logs, created_at, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            &[
                &monitor.id,
                &monitor.region_name,
                &monitor.lat,
                &monitor.lon,
                &monitor.radius_km,
                &monitor.location_key,
                &monitor.start_date,
                &monitor.end_date,
                &monitor.cumulative_rainfall,
                &monitor.current_24h_rainfall,
                &monitor.trigger_rainfall,
                &monitor.status.as_str(),
                &logs,
                &monitor.created_at,
                &monitor.updated_at,
            ],
        )?;
        Ok(())
    }

    fn save(&mut self, monitor: &Monitor) -> Result<(), StoreError> {
        let logs = Self::logs_to_json(monitor)?;
        let updated = self.client.execute(
            "UPDATE monitors SET
                 region_name = $2, lat = $3, lon = $4, radius_km = $5,
                 location_key = $6, start_date = $7, end_date = $8,
                 cumulative_rainfall = $9, current_24h_rainfall = $10,
                 trigger_rainfall = $11, status = $12, logs = $13,
                 updated_at = $14
             WHERE id = $1",
            &[
                &monitor.id,
                &monitor.region_name,
                &monitor.lat,
                &monitor.lon,
                &monitor.radius_km,
                &monitor.location_key,
                &monitor.start_date,
                &monitor.end_date,
                &monitor.cumulative_rainfall,
                &monitor.current_24h_rainfall,
                &monitor.trigger_rainfall,
                &monitor.status.as_str(),
                &logs,
                &monitor.updated_at,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::Query(format!(
                "monitor {} not found for update",
                monitor.id
            )));
        }
        Ok(())
    }
}
