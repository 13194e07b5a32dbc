/// Service configuration.
///
/// Settings load from a TOML file (`rainmon.toml` by default), with
/// environment variable overrides for the secrets so deployments can keep
/// them out of the file: `DATABASE_URL`, `ACCUWEATHER_API_KEY` and
/// `WEBHOOK_URL`. `main` loads `.env` via dotenv before overrides are read.

use serde::Deserialize;
use std::fmt;
use std::fs;

use crate::ingest::accuweather::ACCUWEATHER_BASE_URL;
use crate::logging::LogLevel;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub weather: WeatherConfig,
    pub webhook: WebhookConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgres://localhost:5432/rainmon".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    /// Request timeout in seconds. Kept short so a stalled provider call
    /// cannot hold up the rest of the sweep.
    pub timeout_secs: u64,
    /// Replace the live provider with synthetic readings (dev mode).
    pub simulated: bool,
}

impl Default for WeatherConfig {
    fn default() -> WeatherConfig {
        WeatherConfig {
            api_key: String::new(),
            base_url: ACCUWEATHER_BASE_URL.to_string(),
            timeout_secs: 5,
            simulated: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> WebhookConfig {
        WebhookConfig {
            url: String::new(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> LoggingConfig {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
            console_timestamps: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config read error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "config parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Loads and parses a TOML config file.
    pub fn load(path: &str) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads the config file if present; a missing file yields defaults.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: &str) -> Result<Config, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(ConfigError::Io(e.to_string())),
        }
    }

    /// Applies environment overrides for the secret-bearing fields.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(key) = std::env::var("ACCUWEATHER_API_KEY") {
            self.weather.api_key = key;
        }
        if let Ok(url) = std::env::var("WEBHOOK_URL") {
            self.webhook.url = url;
        }
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.logging.level)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
