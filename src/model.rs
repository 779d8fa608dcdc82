/// Core data types for the AQHI snapshot service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O, only types, the pollutant table layout and the error
/// enums shared across the pipeline.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Page layout constants
// ---------------------------------------------------------------------------

/// Text prefix marking the first cell of a new station in the list view.
pub const STATION_SENTINEL: &str = "Station Names";

/// Cells per station: the name followed by seven pollutant readings.
pub const CELLS_PER_STATION: usize = 8;

/// Marker the source page prints for "no reading".
pub const PLACEHOLDER: &str = "-";

/// Date format used in stored records, e.g. "05/01/2024".
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Natural key of an observation, in field-name form.
pub const NATURAL_KEY: [&str; 3] = ["date", "hour", "station"];

// ---------------------------------------------------------------------------
// Pollutants
// ---------------------------------------------------------------------------

/// The seven readings reported per station, in table order.
///
/// Units: µg/m³ for all pollutants except CO, which is reported in
/// 10 µg/m³. AQHI is a unitless index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pollutant {
    No2,
    O3,
    So2,
    Co,
    Pm10,
    Pm25,
    Aqhi,
}

impl Pollutant {
    /// Table order, matching cell positions 1..=7 of a station block.
    pub const ALL: [Pollutant; 7] = [
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::So2,
        Pollutant::Co,
        Pollutant::Pm10,
        Pollutant::Pm25,
        Pollutant::Aqhi,
    ];

    /// Label the page prefixes onto each reading cell.
    pub fn label(self) -> &'static str {
        match self {
            Pollutant::No2 => "NO2",
            Pollutant::O3 => "O3",
            Pollutant::So2 => "SO2",
            Pollutant::Co => "CO",
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Aqhi => "AQHI",
        }
    }

    /// Field name in stored records.
    pub fn field(self) -> &'static str {
        match self {
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
            Pollutant::So2 => "so2",
            Pollutant::Co => "co",
            Pollutant::Pm10 => "pm10",
            Pollutant::Pm25 => "pm25",
            Pollutant::Aqhi => "aqhi",
        }
    }
}

impl std::fmt::Display for Pollutant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Raw page types
// ---------------------------------------------------------------------------

/// One table cell's text, in document order.
pub type RawCell = String;

/// The raw cells of one station: the bare station name at index 0, then
/// the seven labelled reading cells.
#[derive(Debug, Clone, PartialEq)]
pub struct StationBlock {
    pub cells: Vec<RawCell>,
}

impl StationBlock {
    /// The station name cell, or an empty string for a headless block.
    pub fn station(&self) -> &str {
        self.cells.first().map(String::as_str).unwrap_or("")
    }
}

/// What a page renderer hands to the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub cells: Vec<RawCell>,
    /// Raw observation time, e.g. "(At January 05, 2024 13:30)".
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// One station's readings for one hourly snapshot.
///
/// `hour` is the *end* of the reporting hour (source start hour + 1), so it
/// ranges over 1..=24. A `None` reading means the page reported no value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub hour: u8,
    pub station: String,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub co: Option<f64>,
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub aqhi: Option<f64>,
}

impl Observation {
    pub fn reading(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::No2 => self.no2,
            Pollutant::O3 => self.o3,
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
            Pollutant::Pm10 => self.pm10,
            Pollutant::Pm25 => self.pm25,
            Pollutant::Aqhi => self.aqhi,
        }
    }

    /// Natural key ordering: (date, hour, station).
    pub fn sort_key(&self) -> (NaiveDate, u8, &str) {
        (self.date, self.hour, self.station.as_str())
    }
}

fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub observation_count: usize,
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub hour: u8,
    /// Stations on the page that are not in the registry.
    pub unknown_stations: Vec<String>,
    /// Registry stations absent from the page.
    pub missing_stations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// The page did not have the expected shape. Not retryable: the source
/// layout changed or the snapshot is incomplete.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedInput {
    /// A station block did not have exactly eight cells.
    BlockLength { station: String, cells: usize },
    /// A reading cell held something other than a non-negative number or
    /// the placeholder.
    InvalidReading { station: String, pollutant: Pollutant, text: String },
    /// The observation time did not match "<Month> <Day>, <Year> <HH>:<MM>".
    InvalidTimestamp(String),
    /// The same station name appeared twice in one snapshot.
    DuplicateStation(String),
    /// The page contained no station blocks at all.
    NoStations,
}

impl std::fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedInput::BlockLength { station, cells } => write!(
                f,
                "Malformed input: station block '{}' has {} cells, expected {}",
                station, cells, CELLS_PER_STATION
            ),
            MalformedInput::InvalidReading { station, pollutant, text } => write!(
                f,
                "Malformed input: station '{}' has unreadable {} value '{}'",
                station, pollutant, text
            ),
            MalformedInput::InvalidTimestamp(text) => {
                write!(f, "Malformed input: unrecognised observation time '{}'", text)
            }
            MalformedInput::DuplicateStation(station) => {
                write!(f, "Malformed input: station '{}' appears more than once", station)
            }
            MalformedInput::NoStations => write!(f, "Malformed input: page contained no stations"),
        }
    }
}

impl std::error::Error for MalformedInput {}

/// The page could not be obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Non-2xx HTTP response.
    Http(u16),
    /// Network-level failure (DNS, TLS, timeout, body read).
    Request(String),
    /// The headless browser could not be started or exited unsuccessfully.
    Browser(String),
    /// A saved page could not be read.
    Fixture(String),
    /// The rendered page has no observation-time element.
    MissingTimestamp,
    /// The markup could not be queried.
    Markup(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Http(code) => write!(f, "Render unavailable: HTTP error: {}", code),
            RenderError::Request(msg) => write!(f, "Render unavailable: request failed: {}", msg),
            RenderError::Browser(msg) => write!(f, "Render unavailable: browser failed: {}", msg),
            RenderError::Fixture(msg) => write!(f, "Render unavailable: fixture unreadable: {}", msg),
            RenderError::MissingTimestamp => {
                write!(f, "Render unavailable: page has no observation time")
            }
            RenderError::Markup(msg) => write!(f, "Render unavailable: unusable markup: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

/// The observation store rejected or could not take a write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Connection, transaction or query failure.
    Unavailable(String),
    /// A natural-key collision was rejected instead of overwritten.
    WriteConflict(String),
    /// The store cannot enforce uniqueness on the requested key fields.
    UnsupportedKey(String),
    /// A record lacked a field the store needs.
    InvalidRecord(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::WriteConflict(msg) => write!(f, "Write conflict: {}", msg),
            StoreError::UnsupportedKey(msg) => write!(f, "Unsupported key fields: {}", msg),
            StoreError::InvalidRecord(msg) => write!(f, "Invalid record: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Any failure of a pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    Malformed(MalformedInput),
    Render(RenderError),
    Store(StoreError),
    Config(crate::config::ConfigError),
}

impl PipelineError {
    /// Whether an external retry with backoff could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Render(_) | PipelineError::Store(StoreError::Unavailable(_))
        )
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Malformed(e) => write!(f, "{}", e),
            PipelineError::Render(e) => write!(f, "{}", e),
            PipelineError::Store(e) => write!(f, "{}", e),
            PipelineError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Malformed(e) => Some(e),
            PipelineError::Render(e) => Some(e),
            PipelineError::Store(e) => Some(e),
            PipelineError::Config(e) => Some(e),
        }
    }
}

impl From<MalformedInput> for PipelineError {
    fn from(e: MalformedInput) -> Self {
        PipelineError::Malformed(e)
    }
}

impl From<RenderError> for PipelineError {
    fn from(e: RenderError) -> Self {
        PipelineError::Render(e)
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::Store(e)
    }
}

impl From<crate::config::ConfigError> for PipelineError {
    fn from(e: crate::config::ConfigError) -> Self {
        PipelineError::Config(e)
    }
}
