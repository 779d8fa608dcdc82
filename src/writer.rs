//! Observation store writer.
//!
//! Turns a parsed snapshot into flat records and submits it to a store as
//! a single batch. `WriteMode::Upsert` keys the batch on (date, hour,
//! station) so re-running a snapshot replaces rather than duplicates it.
//! `WriteMode::Insert` submits without a key and leaves duplicate handling
//! to the store.

use serde::Deserialize;

use crate::model::{NATURAL_KEY, Observation, StoreError};
use crate::store::{FlatRecord, ObservationStore, to_flat_record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Upsert,
    Insert,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    pub written: usize,
    pub mode: WriteMode,
}

pub struct ObservationWriter {
    mode: WriteMode,
}

impl ObservationWriter {
    pub fn new(mode: WriteMode) -> Self {
        Self { mode }
    }

    pub fn key_fields(&self) -> &'static [&'static str] {
        match self.mode {
            WriteMode::Upsert => &NATURAL_KEY,
            WriteMode::Insert => &[],
        }
    }

    pub fn write(
        &self,
        store: &mut dyn ObservationStore,
        observations: &[Observation],
    ) -> Result<WriteResult, StoreError> {
        let batch: Vec<FlatRecord> = observations
            .iter()
            .map(to_flat_record)
            .collect::<Result<_, _>>()?;

        let written = if batch.is_empty() {
            0
        } else {
            store.upsert(&batch, self.key_fields())?
        };

        Ok(WriteResult { written, mode: self.mode })
    }
}
