/// Structured logging for the AQHI snapshot service
///
/// Provides context-rich logging with pipeline component and station
/// identifiers, timestamps, and severity levels. Supports both console
/// output and file-based logging for scheduled runs.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::{MalformedInput, PipelineError, RunSummary, StoreError};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
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
// Pipeline Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Render,
    Parse,
    Store,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Render => write!(f, "RENDER"),
            Component::Parse => write!(f, "PARSE"),
            Component::Store => write!(f, "STORE"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Network or database hiccup; the next scheduled run may succeed
    Transient,
    /// The page no longer has the expected shape; needs a code change
    Layout,
    /// The snapshot was already captured and the store refused a duplicate
    Conflict,
    /// Configuration or anything else that needs an operator
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Transient => write!(f, "TRANSIENT"),
            FailureType::Layout => write!(f, "LAYOUT"),
            FailureType::Conflict => write!(f, "CONFLICT"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
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

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, component: &Component, station: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, component, station_part, message
        );

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, station_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, station_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        // File output
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

fn emit(level: LogLevel, component: Component, station: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &component, station, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, station: Option<&str>, message: &str) {
    emit(LogLevel::Info, component, station, message);
}

/// Log a warning message
pub fn warn(component: Component, station: Option<&str>, message: &str) {
    emit(LogLevel::Warning, component, station, message);
}

/// Log an error message
pub fn error(component: Component, station: Option<&str>, message: &str) {
    emit(LogLevel::Error, component, station, message);
}

/// Log a debug message
pub fn debug(component: Component, station: Option<&str>, message: &str) {
    emit(LogLevel::Debug, component, station, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a failed run by what an operator should do about it
pub fn classify_failure(err: &PipelineError) -> FailureType {
    match err {
        PipelineError::Render(_) => FailureType::Transient,
        PipelineError::Store(StoreError::Unavailable(_)) => FailureType::Transient,
        PipelineError::Store(StoreError::WriteConflict(_)) => FailureType::Conflict,
        PipelineError::Malformed(_) => FailureType::Layout,
        PipelineError::Store(_) | PipelineError::Config(_) => FailureType::Unknown,
    }
}

/// Which component a failure came from, and the station it concerns if any
fn failure_origin(err: &PipelineError) -> (Component, Option<&str>) {
    match err {
        PipelineError::Render(_) => (Component::Render, None),
        PipelineError::Store(_) => (Component::Store, None),
        PipelineError::Config(_) => (Component::System, None),
        PipelineError::Malformed(m) => match m {
            MalformedInput::BlockLength { station, .. }
            | MalformedInput::InvalidReading { station, .. }
            | MalformedInput::DuplicateStation(station) => {
                (Component::Parse, Some(station.as_str()))
            }
            MalformedInput::InvalidTimestamp(_) | MalformedInput::NoStations => {
                (Component::Parse, None)
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed run with automatic classification
pub fn log_run_failure(err: &PipelineError) {
    let failure_type = classify_failure(err);
    let (component, station) = failure_origin(err);

    let message = format!("Run failed [{}]: {}", failure_type, err);

    match failure_type {
        FailureType::Transient | FailureType::Conflict => warn(component, station, &message),
        FailureType::Layout | FailureType::Unknown => error(component, station, &message),
    }
}

/// Log a completed run, warning about roster drift
pub fn log_run_summary(summary: &RunSummary) {
    info(
        Component::System,
        None,
        &format!(
            "Captured {} stations for {} hour {}",
            summary.observation_count,
            summary.date.format(crate::model::DATE_FORMAT),
            summary.hour
        ),
    );

    for station in &summary.unknown_stations {
        warn(Component::Parse, Some(station), "Station not in registry");
    }
    if !summary.missing_stations.is_empty() {
        warn(
            Component::Parse,
            None,
            &format!("Registry stations absent from page: {}", summary.missing_stations.join(", ")),
        );
    }
}

// ---------------------------------------------------------------------------
// Watch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of repeated runs
pub fn log_watch_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Watch stopped: {}/{} runs successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(Component::System, None, &message);
    } else if successful == 0 {
        error(Component::System, None, &message);
    } else {
        warn(Component::System, None, &message);
    }
}
