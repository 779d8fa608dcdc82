//! Station block segmentation and reading validation.
//!
//! The list view is flattened into one text cell per table row before it
//! reaches us, so station boundaries are recovered purely by position and
//! the "Station Names" prefix.

use crate::model::{
    CELLS_PER_STATION, MalformedInput, PLACEHOLDER, Pollutant, RawCell, STATION_SENTINEL,
    StationBlock,
};

/// A block that passed validation: station name plus its seven readings in
/// `Pollutant::ALL` order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBlock {
    pub station: String,
    pub readings: [Option<f64>; 7],
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Bare station name from a boundary cell: sentinel removed, anything from
/// the first "(" dropped, whitespace trimmed.
///
/// "Station Names Central (Roadside)" → "Central"
pub fn station_name(boundary: &str) -> String {
    let without_sentinel = boundary.replace(STATION_SENTINEL, "");
    without_sentinel
        .split('(')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Split the flat cell sequence into per-station blocks.
///
/// Cells before the first boundary form a block of their own; it is kept
/// so validation can reject it rather than silently discarding data.
pub fn segment(cells: &[RawCell]) -> Vec<StationBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<RawCell> = Vec::new();

    for cell in cells {
        if cell.starts_with(STATION_SENTINEL) {
            if !current.is_empty() {
                blocks.push(StationBlock { cells: std::mem::take(&mut current) });
            }
            current.push(station_name(cell));
        } else {
            current.push(cell.clone());
        }
    }

    if !current.is_empty() {
        blocks.push(StationBlock { cells: current });
    }

    blocks
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Parse one labelled reading cell.
///
/// The label is stripped and the rest trimmed; an empty remainder or the
/// placeholder dash means "not available". Anything else must be a finite,
/// non-negative decimal.
pub fn parse_reading(
    station: &str,
    pollutant: Pollutant,
    cell: &str,
) -> Result<Option<f64>, MalformedInput> {
    let stripped = cell.replace(pollutant.label(), "");
    let text = stripped.trim();

    if text.is_empty() || text == PLACEHOLDER {
        return Ok(None);
    }

    let invalid = || MalformedInput::InvalidReading {
        station: station.to_string(),
        pollutant,
        text: cell.to_string(),
    };

    let value: f64 = text.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(Some(value))
}

/// Check a block has exactly eight cells and parse its readings.
pub fn validate(block: &StationBlock) -> Result<ValidatedBlock, MalformedInput> {
    let station = block.station();

    if block.cells.len() != CELLS_PER_STATION {
        return Err(MalformedInput::BlockLength {
            station: station.to_string(),
            cells: block.cells.len(),
        });
    }

    let mut readings = [None; 7];
    for (slot, (pollutant, cell)) in readings
        .iter_mut()
        .zip(Pollutant::ALL.iter().zip(&block.cells[1..]))
    {
        *slot = parse_reading(station, *pollutant, cell)?;
    }

    Ok(ValidatedBlock { station: station.to_string(), readings })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
