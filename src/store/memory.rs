//! In-process observation store.
//!
//! Behaves like a document collection: records are kept in insertion order
//! and looked up through an ordered map of their key values. Without key
//! fields every record is appended, so repeated plain inserts duplicate
//! data unless a unique index was declared with `with_unique_index`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::model::{DATE_FORMAT, StoreError};
use crate::store::{FlatRecord, ObservationStore, describe_key, key_values};

/// JSON text of the key values; unlike `describe_key` it cannot collide.
fn index_key(values: Vec<Value>) -> String {
    Value::Array(values).to_string()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<FlatRecord>,
    unique_index: Option<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects plain inserts colliding on `fields`.
    pub fn with_unique_index(fields: &[&str]) -> Self {
        Self {
            records: Vec::new(),
            unique_index: Some(fields.iter().map(|f| f.to_string()).collect()),
        }
    }

    pub fn records(&self) -> &[FlatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of each stored record by its `fields` values. Records
    /// lacking one of the fields are not indexed.
    fn key_index(records: &[FlatRecord], fields: &[&str]) -> BTreeMap<String, usize> {
        records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| key_values(r, fields).ok().map(|k| (index_key(k), i)))
            .collect()
    }

    fn insert_all(&self, staged: &mut Vec<FlatRecord>, batch: &[FlatRecord]) -> Result<(), StoreError> {
        let fields: Vec<&str> = match &self.unique_index {
            Some(fields) => fields.iter().map(String::as_str).collect(),
            None => {
                staged.extend(batch.iter().cloned());
                return Ok(());
            }
        };

        let mut index = Self::key_index(staged, &fields);
        for record in batch {
            let values = key_values(record, &fields)?;
            let key = index_key(values.clone());
            if index.contains_key(&key) {
                return Err(StoreError::WriteConflict(describe_key(&values)));
            }
            index.insert(key, staged.len());
            staged.push(record.clone());
        }
        Ok(())
    }
}

impl ObservationStore for MemoryStore {
    fn upsert(&mut self, batch: &[FlatRecord], key_fields: &[&str]) -> Result<usize, StoreError> {
        // Work on a copy so a failure part way leaves the store untouched.
        let mut staged = self.records.clone();

        if key_fields.is_empty() {
            self.insert_all(&mut staged, batch)?;
        } else {
            let mut index = Self::key_index(&staged, key_fields);
            for record in batch {
                let key = index_key(key_values(record, key_fields)?);
                match index.get(&key) {
                    Some(&i) => staged[i] = record.clone(),
                    None => {
                        index.insert(key, staged.len());
                        staged.push(record.clone());
                    }
                }
            }
        }

        self.records = staged;
        Ok(batch.len())
    }

    fn find(&mut self, date: NaiveDate, hour: u8) -> Result<Vec<FlatRecord>, StoreError> {
        let date_text = date.format(DATE_FORMAT).to_string();
        let mut found: Vec<FlatRecord> = self
            .records
            .iter()
            .filter(|r| {
                r.get("date").and_then(Value::as_str) == Some(date_text.as_str())
                    && r.get("hour").and_then(Value::as_u64) == Some(u64::from(hour))
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            let station = |r: &FlatRecord| r.get("station").and_then(Value::as_str).map(String::from);
            station(a).cmp(&station(b))
        });
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NATURAL_KEY;
    use serde_json::json;

    fn record(station: &str, aqhi: f64) -> FlatRecord {
        match json!({"date": "05/01/2024", "hour": 14, "station": station, "aqhi": aqhi}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_upsert_replaces_matching_key() {
        let mut store = MemoryStore::new();
        store.upsert(&[record("Central", 4.0), record("Eastern", 3.0)], &NATURAL_KEY).unwrap();
        store.upsert(&[record("Central", 5.0)], &NATURAL_KEY).unwrap();

        assert_eq!(store.len(), 2);
        let central = store.records().iter().find(|r| r["station"] == "Central").unwrap();
        assert_eq!(central["aqhi"], 5.0);
    }

    #[test]
    fn test_plain_insert_duplicates_without_index() {
        let mut store = MemoryStore::new();
        store.upsert(&[record("Central", 4.0)], &[]).unwrap();
        store.upsert(&[record("Central", 4.0)], &[]).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_plain_insert_conflicts_with_unique_index() {
        let mut store = MemoryStore::with_unique_index(&NATURAL_KEY);
        store.upsert(&[record("Central", 4.0)], &[]).unwrap();

        let err = store
            .upsert(&[record("Eastern", 2.0), record("Central", 4.0)], &[])
            .unwrap_err();
        assert_eq!(err, StoreError::WriteConflict("05/01/2024 14 Central".to_string()));
        assert_eq!(store.len(), 1, "failed batch must not be partially applied");
    }

    #[test]
    fn test_large_snapshot_rerun_replaces_in_place() {
        let mut store = MemoryStore::new();
        let batch: Vec<FlatRecord> = (0..5000).map(|i| record(&format!("Station {}", i), 1.0)).collect();

        store.upsert(&batch, &NATURAL_KEY).unwrap();
        let mut rerun = batch.clone();
        rerun[4321].insert("aqhi".to_string(), json!(9.0));
        store.upsert(&rerun, &NATURAL_KEY).unwrap();

        assert_eq!(store.len(), 5000);
        assert_eq!(store.records()[4321]["aqhi"], 9.0);
    }

    #[test]
    fn test_duplicate_key_within_one_insert_batch_conflicts() {
        let mut store = MemoryStore::with_unique_index(&NATURAL_KEY);
        let err = store
            .upsert(&[record("Central", 4.0), record("Central", 5.0)], &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::WriteConflict(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_key_field_rejects_whole_batch() {
        let mut store = MemoryStore::new();
        let mut bad = record("Eastern", 2.0);
        bad.remove("hour");

        let result = store.upsert(&[record("Central", 4.0), bad], &NATURAL_KEY);
        assert!(matches!(result, Err(StoreError::InvalidRecord(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_find_filters_snapshot_and_orders_by_station() {
        let mut store = MemoryStore::new();
        let mut other_hour = record("Central", 1.0);
        other_hour.insert("hour".to_string(), json!(15));
        store
            .upsert(&[record("Tai Po", 2.0), record("Central", 4.0), other_hour], &NATURAL_KEY)
            .unwrap();

        let found = store.find(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 14).unwrap();
        let stations: Vec<&str> = found.iter().map(|r| r["station"].as_str().unwrap()).collect();
        assert_eq!(stations, ["Central", "Tai Po"]);
    }
}
