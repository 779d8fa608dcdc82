/// Record parser: flat page cells → validated per-station observations.
///
/// Pure and deterministic; no I/O. Any structural anomaly aborts the whole
/// parse with a `MalformedInput` naming the offending station or cell, so a
/// partially populated snapshot is never produced.
///
/// Submodules:
/// - `blocks`   : sentinel segmentation and reading validation.
/// - `timestamp`: observation time → (date, end-of-hour).

pub mod blocks;
pub mod timestamp;

use std::collections::HashSet;

use crate::model::{MalformedInput, Observation, RawCell, RenderedPage};

pub use blocks::{ValidatedBlock, segment, validate};
pub use timestamp::parse_timestamp;

/// Parse one snapshot.
///
/// Output is sorted by (date, hour, station) and station names are unique.
/// An empty cell list parses to an empty snapshot.
pub fn parse(cells: &[RawCell], timestamp: &str) -> Result<Vec<Observation>, MalformedInput> {
    let (date, hour) = parse_timestamp(timestamp)?;

    let mut seen = HashSet::new();
    let mut observations = Vec::new();

    for block in segment(cells) {
        let ValidatedBlock { station, readings } = validate(&block)?;

        if !seen.insert(station.clone()) {
            return Err(MalformedInput::DuplicateStation(station));
        }

        let [no2, o3, so2, co, pm10, pm25, aqhi] = readings;
        observations.push(Observation {
            date,
            hour,
            station,
            no2,
            o3,
            so2,
            co,
            pm10,
            pm25,
            aqhi,
        });
    }

    observations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(observations)
}

/// Parse a rendered page.
pub fn parse_page(page: &RenderedPage) -> Result<Vec<Observation>, MalformedInput> {
    parse(&page.cells, &page.timestamp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
