//! Rendered markup → flat table cells.
//!
//! Each `<tr>` contributes one cell. Within a `<th>`/`<td>` the text nodes
//! are concatenated as rendered (so "NO<sub>2</sub>" reads "NO2"); the row's
//! cells are then joined with a space and whitespace runs collapsed. The
//! list view follows the map legend tables on the page, so rows before the
//! first "Station Names" row are dropped.

use scraper::{ElementRef, Html, Selector};

use crate::model::{RawCell, RenderError, RenderedPage, STATION_SENTINEL};

const ROW_SELECTOR: &str = "tr";
const CELL_SELECTOR: &str = "th, td";
const TIME_SELECTOR: &str = "div.myTimeInTable";

fn selector(css: &str) -> Result<Selector, RenderError> {
    Selector::parse(css).map_err(|e| RenderError::Markup(format!("selector {}: {:?}", css, e)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rendered text of an element, whitespace-normalised.
fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text of one table row: its cells' texts separated by spaces, or the
/// whole row's text when it has no cells.
fn row_text(row: ElementRef<'_>, cells: &Selector) -> String {
    let parts: Vec<String> = row.select(cells).map(element_text).collect();
    if parts.is_empty() {
        element_text(row)
    } else {
        collapse_whitespace(&parts.join(" "))
    }
}

/// Extract the station table cells and observation time from page markup.
pub fn extract(html: &str) -> Result<RenderedPage, RenderError> {
    let document = Html::parse_document(html);
    let rows = selector(ROW_SELECTOR)?;
    let row_cells = selector(CELL_SELECTOR)?;
    let time = selector(TIME_SELECTOR)?;

    let cells: Vec<RawCell> = document
        .select(&rows)
        .map(|row| row_text(row, &row_cells))
        .skip_while(|text| !text.starts_with(STATION_SENTINEL))
        .collect();

    let timestamp = document
        .select(&time)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .ok_or(RenderError::MissingTimestamp)?;

    Ok(RenderedPage { cells, timestamp })
}
