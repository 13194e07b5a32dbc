/// Structured logging for the rainfall monitoring service.
///
/// Provides context-rich logging tagged with the emitting component and an
/// optional region identifier. Supports console output and file-based
/// logging for daemon operation, plus failure classification for the
/// degradable collaborators (weather provider, webhook endpoint).

use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses a config-file level name. Unknown names fall back to `Info`.
    pub fn parse(name: &str) -> LogLevel {
        match name.to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Subsystem a log line originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Weather,
    Webhook,
    Database,
    Engine,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Weather => write!(f, "WEATHER"),
            Component::Webhook => write!(f, "WEBHOOK"),
            Component::Database => write!(f, "DB"),
            Component::Engine => write!(f, "ENGINE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure, e.g. a provider briefly timing out.
    Expected,
    /// Unexpected failure that indicates misconfiguration or degradation.
    Unexpected,
    /// Cannot determine whether this failure is expected.
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        *LOGGER.lock().unwrap() = Some(logger);
    }

    fn log(&self, level: LogLevel, component: Component, region: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let region_part = region.map(|r| format!(" [{}]", r)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, component, region_part, message
        );

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("✗ {}{}: {}", component, region_part, message),
                LogLevel::Warning => eprintln!("⚠ {}{}: {}", component, region_part, message),
                LogLevel::Info => println!("{}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

/// Log a general informational message
pub fn info(component: Component, region: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Info, component, region, message);
    }
}

/// Log a warning message
pub fn warn(component: Component, region: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Warning, component, region, message);
    }
}

/// Log an error message
pub fn error(component: Component, region: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Error, component, region, message);
    }
}

/// Log a debug message
pub fn debug(component: Component, region: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Debug, component, region, message);
    }
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a weather provider failure based on the error message.
pub fn classify_weather_failure(error_message: &str) -> FailureType {
    // Timeouts and connect failures happen routinely against a public
    // weather API; the engine degrades to a zero reading either way.
    if error_message.contains("timed out") || error_message.contains("timeout") {
        FailureType::Expected
    }
    // Auth and quota rejections mean the API key is wrong or exhausted.
    else if error_message.contains("HTTP error: 401")
        || error_message.contains("HTTP error: 403")
        || error_message.contains("HTTP error: 503")
    {
        FailureType::Unexpected
    }
    // Parse errors suggest the provider changed its response shape.
    else if error_message.contains("Parse error") {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Log a weather provider failure with automatic classification.
pub fn log_weather_failure(location_key: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_weather_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(Component::Weather, Some(location_key), &message),
        FailureType::Unexpected => error(Component::Weather, Some(location_key), &message),
        FailureType::Unknown => warn(Component::Weather, Some(location_key), &message),
    }
}

/// Log a failed trigger notification. Always an error: the crossing was
/// real, the downstream consumer just never heard about it.
pub fn log_webhook_failure(region: &str, err: &dyn std::error::Error) {
    error(
        Component::Webhook,
        Some(region),
        &format!("trigger notification failed (status change stands): {}", err),
    );
}

// ---------------------------------------------------------------------------
// Cycle Summary Logging
// ---------------------------------------------------------------------------

/// Log a one-line summary of an evaluation cycle.
pub fn log_cycle_summary(
    cycle_hour: DateTime<Utc>,
    evaluated: usize,
    updated: usize,
    triggered: usize,
    persist_failures: usize,
) {
    let message = format!(
        "cycle {}: {} evaluated, {} updated, {} triggered, {} persist failures",
        cycle_hour.format("%Y-%m-%d %H:00"),
        evaluated,
        updated,
        triggered,
        persist_failures
    );

    if persist_failures > 0 {
        warn(Component::Engine, None, &message);
    } else {
        info(Component::Engine, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("WARN"), LogLevel::Warning);
        assert_eq!(LogLevel::parse("error"), LogLevel::Error);
        assert_eq!(LogLevel::parse("something-else"), LogLevel::Info);
    }

    #[test]
    fn test_failure_classification() {
        let timeout = "Request failed: operation timed out";
        assert_eq!(classify_weather_failure(timeout), FailureType::Expected);

        let bad_key = "HTTP error: 401";
        assert_eq!(classify_weather_failure(bad_key), FailureType::Unexpected);

        let shape_change = "Parse error: missing field `Key`";
        assert_eq!(classify_weather_failure(shape_change), FailureType::Unexpected);

        let mystery = "HTTP error: 418";
        assert_eq!(classify_weather_failure(mystery), FailureType::Unknown);
    }
}
