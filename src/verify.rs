//! Collaborator Verification Module
//!
//! Framework for testing the configured external collaborators against
//! their live endpoints: the monitor database and the weather provider.
//! Run via `rainmon_service --verify` before first deployment or after a
//! configuration change to confirm the service can actually operate.

use chrono::Utc;
use postgres::NoTls;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::ingest::accuweather;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub database: DatabaseVerification,
    pub weather: WeatherVerification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseVerification {
    pub status: VerificationStatus,
    pub reachable: bool,
    pub monitors_table_present: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherVerification {
    pub status: VerificationStatus,
    pub location_resolved: bool,
    pub resolved_key: Option<String>,
    pub conditions_available: bool,
    pub sample_rainfall_mm: Option<f64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Database Verification
// ============================================================================

pub fn verify_database(url: &str) -> DatabaseVerification {
    let mut result = DatabaseVerification {
        status: VerificationStatus::Failed,
        reachable: false,
        monitors_table_present: false,
        error_message: None,
    };

    let mut client = match postgres::Client::connect(url, NoTls) {
        Ok(client) => client,
        Err(e) => {
            result.error_message = Some(format!("Connection failed: {}", e));
            return result;
        }
    };
    result.reachable = true;

    match client.query_one("SELECT to_regclass('monitors') IS NOT NULL", &[]) {
        Ok(row) => {
            result.monitors_table_present = row.get(0);
        }
        Err(e) => {
            result.error_message = Some(format!("Table check failed: {}", e));
        }
    }

    // A reachable database without the table is fine; the schema bootstrap
    // creates it on the first daemon start.
    result.status = if result.monitors_table_present {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };

    result
}

// ============================================================================
// Weather Provider Verification
// ============================================================================

/// Reference coordinate used for the provider round trip: central Nairobi.
const PROBE_LAT: f64 = -1.2921;
const PROBE_LON: f64 = 36.8219;

pub fn verify_weather(base_url: &str, api_key: &str) -> WeatherVerification {
    let mut result = WeatherVerification {
        status: VerificationStatus::Failed,
        location_resolved: false,
        resolved_key: None,
        conditions_available: false,
        sample_rainfall_mm: None,
        error_message: None,
    };

    let client = match reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            result.error_message = Some(format!("Client build failed: {}", e));
            return result;
        }
    };

    // Test 1: Resolve a known coordinate to a location key.
    let key = match accuweather::fetch_location_key(&client, base_url, api_key, PROBE_LAT, PROBE_LON)
    {
        Ok(key) => {
            result.location_resolved = true;
            result.resolved_key = Some(key.clone());
            key
        }
        Err(e) => {
            result.error_message = Some(format!("Location resolution failed: {}", e));
            return result;
        }
    };

    // Test 2: Fetch current conditions for the resolved key.
    match accuweather::fetch_hourly_rainfall(&client, base_url, api_key, &key) {
        Ok(mm) => {
            result.conditions_available = true;
            result.sample_rainfall_mm = Some(mm);
            result.status = VerificationStatus::Success;
        }
        Err(e) => {
            result.error_message = Some(format!("Conditions fetch failed: {}", e));
            result.status = VerificationStatus::PartialSuccess;
        }
    }

    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn run_full_verification(config: &Config) -> VerificationReport {
    println!("Verifying database...");
    let database = verify_database(&config.database.url);
    match &database.status {
        VerificationStatus::Success => println!("  ✓ reachable, monitors table present"),
        VerificationStatus::PartialSuccess => {
            println!("  ⚠ reachable, monitors table missing (created on first start)")
        }
        VerificationStatus::Failed => println!(
            "  ✗ FAILED: {}",
            database.error_message.as_deref().unwrap_or("Unknown")
        ),
    }

    println!("Verifying weather provider...");
    let weather = verify_weather(&config.weather.base_url, &config.weather.api_key);
    match &weather.status {
        VerificationStatus::Success => println!(
            "  ✓ location {} resolved, past-hour rainfall {} mm",
            weather.resolved_key.as_deref().unwrap_or("?"),
            weather.sample_rainfall_mm.unwrap_or(0.0)
        ),
        VerificationStatus::PartialSuccess => println!(
            "  ⚠ location resolved but conditions unavailable: {}",
            weather.error_message.as_deref().unwrap_or("Unknown")
        ),
        VerificationStatus::Failed => println!(
            "  ✗ FAILED: {}",
            weather.error_message.as_deref().unwrap_or("Unknown")
        ),
    }

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        database,
        weather,
    }
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════");
    println!("VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════════");
    println!("Database: {:?}", report.database.status);
    println!("Weather:  {:?}", report.weather.status);

    let operational = report.database.status != VerificationStatus::Failed
        && report.weather.status != VerificationStatus::Failed;
    if operational {
        println!("\nService can operate with this configuration.");
    } else {
        println!("\nService CANNOT operate; fix the failures above.");
    }
    println!("═══════════════════════════════════════════════");
}
