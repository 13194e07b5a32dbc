/// AccuWeather Data API client.
///
/// Two endpoints are consumed:
/// - Geoposition search resolves a coordinate pair to an opaque location
///   key, once per monitor at creation time.
/// - Current conditions (with details) yields the past-hour precipitation
///   summary in millimeters, once per monitoring monitor per cycle.
///
/// API documentation: https://developer.accuweather.com/apis

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::engine::ReadingSource;
use crate::logging::{self, Component};

pub const ACCUWEATHER_BASE_URL: &str = "http://dataservice.accuweather.com";

// ============================================================================
// AccuWeather API Response Structures
// ============================================================================

/// Geoposition search response. Only the location key is consumed.
#[derive(Debug, Deserialize)]
pub struct GeoPositionResponse {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "LocalizedName")]
    pub localized_name: Option<String>,
}

/// One entry of a current-conditions response (the API returns an array).
#[derive(Debug, Deserialize)]
pub struct CurrentConditions {
    #[serde(rename = "LocalObservationDateTime")]
    pub observation_time: Option<String>,
    #[serde(rename = "PrecipitationSummary")]
    pub precipitation_summary: Option<PrecipitationSummary>,
}

#[derive(Debug, Deserialize)]
pub struct PrecipitationSummary {
    #[serde(rename = "PastHour")]
    pub past_hour: Option<PastHour>,
}

#[derive(Debug, Deserialize)]
pub struct PastHour {
    #[serde(rename = "Metric")]
    pub metric: Option<UnitValue>,
}

#[derive(Debug, Deserialize)]
pub struct UnitValue {
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Unit")]
    pub unit: String,
}

// ============================================================================
// Error types
// ============================================================================

/// Errors that can arise when fetching AccuWeather data.
#[derive(Debug, PartialEq)]
pub enum WeatherError {
    /// Non-2xx HTTP response from the API.
    HttpError(u16),
    /// The request never completed (connect failure, timeout).
    RequestFailed(String),
    /// The response body could not be deserialized.
    ParseError(String),
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherError::HttpError(code) => write!(f, "HTTP error: {}", code),
            WeatherError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            WeatherError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for WeatherError {}

// ============================================================================
// API Client Functions
// ============================================================================

/// Resolve a coordinate pair to an AccuWeather location key.
pub fn fetch_location_key(
    client: &reqwest::blocking::Client,
    base_url: &str,
    api_key: &str,
    lat: f64,
    lon: f64,
) -> Result<String, WeatherError> {
    let url = format!(
        "{}/locations/v1/cities/geoposition/search?apikey={}&q={},{}",
        base_url, api_key, lat, lon
    );

    let response = client
        .get(&url)
        .send()
        .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(WeatherError::HttpError(response.status().as_u16()));
    }

    let geo: GeoPositionResponse = response
        .json()
        .map_err(|e| WeatherError::ParseError(e.to_string()))?;

    Ok(geo.key)
}

/// Fetch the past-hour precipitation for a location key, in millimeters.
///
/// A well-formed response that simply lacks a precipitation summary (some
/// stations never report one) reads as 0.0 rather than an error.
pub fn fetch_hourly_rainfall(
    client: &reqwest::blocking::Client,
    base_url: &str,
    api_key: &str,
    location_key: &str,
) -> Result<f64, WeatherError> {
    let url = format!(
        "{}/currentconditions/v1/{}?apikey={}&details=true",
        base_url, location_key, api_key
    );

    let response = client
        .get(&url)
        .send()
        .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(WeatherError::HttpError(response.status().as_u16()));
    }

    let conditions: Vec<CurrentConditions> = response
        .json()
        .map_err(|e| WeatherError::ParseError(e.to_string()))?;

    Ok(past_hour_mm(&conditions))
}

/// Extracts the past-hour metric value from a current-conditions response.
/// Missing pieces anywhere along the path read as 0.0; negative sentinel
/// values are clamped since a rainfall amount cannot be negative.
pub fn past_hour_mm(conditions: &[CurrentConditions]) -> f64 {
    conditions
        .first()
        .and_then(|c| c.precipitation_summary.as_ref())
        .and_then(|summary| summary.past_hour.as_ref())
        .and_then(|past| past.metric.as_ref())
        .map(|metric| metric.value)
        .unwrap_or(0.0)
        .max(0.0)
}

/// Placeholder location handle used when geoposition resolution fails.
/// Keeps monitor creation alive while the provider is unreachable; the
/// monitor still exists and reads degrade to 0.0 until the key is fixed.
pub fn fallback_location_key(lat: f64, lon: f64) -> String {
    format!("FALLBACK_{}_{}", lat.floor(), lon.floor())
}

// ============================================================================
// Reading source adapter
// ============================================================================

/// Live reading source backed by the AccuWeather API.
///
/// Both operations degrade instead of failing: the engine must keep
/// sweeping and monitor creation must succeed even when the provider is
/// down. Failures are classified and logged for diagnostics.
pub struct AccuWeatherSource {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl AccuWeatherSource {
    /// The timeout bounds each request so one slow provider call cannot
    /// stall the rest of the sweep.
    pub fn new(api_key: &str, timeout: Duration) -> Result<AccuWeatherSource, WeatherError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;
        Ok(AccuWeatherSource {
            client,
            base_url: ACCUWEATHER_BASE_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> AccuWeatherSource {
        self.base_url = base_url.to_string();
        self
    }
}

impl ReadingSource for AccuWeatherSource {
    fn resolve_location(&self, lat: f64, lon: f64) -> String {
        match fetch_location_key(&self.client, &self.base_url, &self.api_key, lat, lon) {
            Ok(key) => key,
            Err(e) => {
                logging::log_weather_failure("geoposition", "location resolution", &e);
                fallback_location_key(lat, lon)
            }
        }
    }

    fn hourly_rainfall(&self, location_key: Option<&str>) -> f64 {
        let Some(key) = location_key else {
            logging::warn(
                Component::Weather,
                None,
                "monitor has no location key, reading degrades to 0.0 mm",
            );
            return 0.0;
        };
        match fetch_hourly_rainfall(&self.client, &self.base_url, &self.api_key, key) {
            Ok(mm) => mm,
            Err(e) => {
                logging::log_weather_failure(key, "hourly rainfall fetch", &e);
                0.0
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geoposition_response() {
        let raw = r#"{
            "Version": 1,
            "Key": "224758",
            "Type": "City",
            "LocalizedName": "Kisumu"
        }"#;
        let geo: GeoPositionResponse = serde_json::from_str(raw).expect("should parse");
        assert_eq!(geo.key, "224758");
        assert_eq!(geo.localized_name.as_deref(), Some("Kisumu"));
    }

    #[test]
    fn test_parse_current_conditions_with_precipitation() {
        let raw = r#"[{
            "LocalObservationDateTime": "2026-03-02T11:49:00+03:00",
            "WeatherText": "Rain",
            "PrecipitationSummary": {
                "PastHour": {
                    "Metric": { "Value": 6.3, "Unit": "mm", "UnitType": 3 },
                    "Imperial": { "Value": 0.25, "Unit": "in", "UnitType": 1 }
                }
            }
        }]"#;
        let conditions: Vec<CurrentConditions> = serde_json::from_str(raw).expect("should parse");
        assert_eq!(past_hour_mm(&conditions), 6.3);
    }

    #[test]
    fn test_missing_precipitation_summary_reads_as_zero() {
        let raw = r#"[{ "LocalObservationDateTime": "2026-03-02T11:49:00+03:00" }]"#;
        let conditions: Vec<CurrentConditions> = serde_json::from_str(raw).expect("should parse");
        assert_eq!(past_hour_mm(&conditions), 0.0);
    }

    #[test]
    fn test_empty_conditions_array_reads_as_zero() {
        assert_eq!(past_hour_mm(&[]), 0.0);
    }

    #[test]
    fn test_negative_sentinel_value_is_clamped() {
        let raw = r#"[{
            "PrecipitationSummary": {
                "PastHour": { "Metric": { "Value": -999.0, "Unit": "mm" } }
            }
        }]"#;
        let conditions: Vec<CurrentConditions> = serde_json::from_str(raw).expect("should parse");
        assert_eq!(past_hour_mm(&conditions), 0.0);
    }

    #[test]
    fn test_fallback_key_floors_coordinates() {
        assert_eq!(fallback_location_key(40.7128, -74.0060), "FALLBACK_40_-75");
        assert_eq!(fallback_location_key(-0.0917, 34.768), "FALLBACK_-1_34");
    }

    #[test]
    fn test_weather_error_display() {
        assert_eq!(WeatherError::HttpError(503).to_string(), "HTTP error: 503");
        assert!(
            WeatherError::ParseError("missing field `Key`".to_string())
                .to_string()
                .starts_with("Parse error")
        );
    }
}
