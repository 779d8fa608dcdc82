//! Hong Kong AQHI snapshot service.
//!
//! Captures the EPD's hourly per-station pollutant table, normalises it
//! into one `Observation` per station and upserts the snapshot into
//! PostgreSQL keyed by (date, hour, station).

pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod stations;
pub mod store;
pub mod writer;
