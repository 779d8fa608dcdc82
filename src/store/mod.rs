/// Observation stores: anything that durably keeps flat observation
/// records and can upsert them by a set of key fields.
///
/// Submodules:
/// - `postgres`: JSONB documents in PostgreSQL, unique on the natural key.
/// - `memory`  : in-process store for tests and dry runs.

pub mod memory;
pub mod postgres;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::model::{DATE_FORMAT, Observation, StoreError};
use crate::writer::WriteMode;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// One observation as a flat field → value mapping. "Not available"
/// readings are `Value::Null`.
pub type FlatRecord = Map<String, Value>;

pub trait ObservationStore {
    /// Write the whole batch or nothing. With `key_fields`, a record whose
    /// key matches an existing one replaces it; without, every record is
    /// inserted. Returns the number of records written.
    fn upsert(&mut self, batch: &[FlatRecord], key_fields: &[&str]) -> Result<usize, StoreError>;

    /// All records for one snapshot, ordered by station.
    fn find(&mut self, date: NaiveDate, hour: u8) -> Result<Vec<FlatRecord>, StoreError>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub database_url: Option<String>,
    pub table: String,
    pub write_mode: WriteMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Postgres,
            database_url: None,
            table: "aqhi.observations".to_string(),
            write_mode: WriteMode::Upsert,
        }
    }
}

/// Build the configured store. Connections are opened per operation, so
/// this never touches the network.
pub fn open(config: &StoreConfig) -> Result<Box<dyn ObservationStore>, StoreError> {
    match config.kind {
        StoreKind::Memory => Ok(Box::new(MemoryStore::new())),
        StoreKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("DATABASE_URL not set".to_string()))?;
            Ok(Box::new(PostgresStore::new(url, &config.table)))
        }
    }
}

// ---------------------------------------------------------------------------
// Record helpers
// ---------------------------------------------------------------------------

/// Serialize an observation into its flat stored form.
pub fn to_flat_record(observation: &Observation) -> Result<FlatRecord, StoreError> {
    match serde_json::to_value(observation) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::InvalidRecord(format!("expected object, got {}", other))),
        Err(e) => Err(StoreError::InvalidRecord(e.to_string())),
    }
}

/// Values of `key_fields` in `record`, in key order.
pub fn key_values(record: &FlatRecord, key_fields: &[&str]) -> Result<Vec<Value>, StoreError> {
    key_fields
        .iter()
        .map(|field| {
            record
                .get(*field)
                .filter(|v| !v.is_null())
                .cloned()
                .ok_or_else(|| StoreError::InvalidRecord(format!("missing key field '{}'", field)))
        })
        .collect()
}

/// Human-readable key for conflict messages, e.g. "05/01/2024 14 Central".
pub fn describe_key(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The natural key of a record in typed form.
pub fn natural_key(record: &FlatRecord) -> Result<(NaiveDate, u8, String), StoreError> {
    let date_text = record
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidRecord("missing 'date'".to_string()))?;
    let date = NaiveDate::parse_from_str(date_text, DATE_FORMAT)
        .map_err(|_| StoreError::InvalidRecord(format!("bad date '{}'", date_text)))?;

    let hour = record
        .get("hour")
        .and_then(Value::as_u64)
        .and_then(|h| u8::try_from(h).ok())
        .ok_or_else(|| StoreError::InvalidRecord("missing or bad 'hour'".to_string()))?;

    let station = record
        .get("station")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidRecord("missing 'station'".to_string()))?;

    Ok((date, hour, station.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> FlatRecord {
        match json!({"date": "05/01/2024", "hour": 14, "station": "Central", "no2": null}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_key_values_in_key_order() {
        let values = key_values(&record(), &["station", "hour"]).unwrap();
        assert_eq!(values, vec![json!("Central"), json!(14)]);
        assert_eq!(describe_key(&values), "Central 14");
    }

    #[test]
    fn test_null_key_field_is_invalid() {
        assert!(matches!(
            key_values(&record(), &["no2"]),
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_natural_key_parses_day_first_date() {
        let (date, hour, station) = natural_key(&record()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(hour, 14);
        assert_eq!(station, "Central");
    }

    #[test]
    fn test_postgres_store_needs_url() {
        let config = StoreConfig::default();
        assert!(matches!(open(&config), Err(StoreError::Unavailable(_))));
    }
}
