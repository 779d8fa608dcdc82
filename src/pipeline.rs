/// One snapshot run: render → parse → write.
///
/// The run either persists every station on the page or nothing: parsing
/// is all-or-nothing and the store writes the batch atomically. Errors are
/// returned, never retried here; `PipelineError::is_transient` tells the
/// caller whether retrying later makes sense.

use crate::ingest::{self, PageRenderer, RendererConfig};
use crate::logging::{self, Component};
use crate::model::{MalformedInput, PipelineError, RenderedPage, RunSummary};
use crate::parse;
use crate::stations;
use crate::store::{self, ObservationStore, StoreConfig};
use crate::writer::{ObservationWriter, WriteMode};

/// Run the pipeline against the configured renderer and store.
pub fn run(renderer: &RendererConfig, store: &StoreConfig) -> Result<RunSummary, PipelineError> {
    let page = ingest::render(renderer)?;
    let mut store_handle = store::open(store)?;
    capture(&page, store_handle.as_mut(), store.write_mode)
}

/// Run the pipeline with explicit collaborators.
pub fn run_with(
    renderer: &dyn PageRenderer,
    url: &str,
    store: &mut dyn ObservationStore,
    mode: WriteMode,
) -> Result<RunSummary, PipelineError> {
    let page = renderer.render(url)?;
    capture(&page, store, mode)
}

/// Parse an already rendered page and write it.
pub fn capture(
    page: &RenderedPage,
    store: &mut dyn ObservationStore,
    mode: WriteMode,
) -> Result<RunSummary, PipelineError> {
    logging::debug(
        Component::Parse,
        None,
        &format!("{} cells, time text '{}'", page.cells.len(), page.timestamp),
    );

    let observations = parse::parse_page(page)?;
    let first = observations.first().ok_or(MalformedInput::NoStations)?;
    let (date, hour) = (first.date, first.hour);

    let (unknown_stations, missing_stations) =
        stations::roster_drift(observations.iter().map(|o| o.station.as_str()));

    let result = ObservationWriter::new(mode).write(store, &observations)?;
    logging::debug(
        Component::Store,
        None,
        &format!("{:?} wrote {} records", result.mode, result.written),
    );

    Ok(RunSummary {
        observation_count: observations.len(),
        date,
        hour,
        unknown_stations,
        missing_stations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RenderError, StoreError};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    struct StaticRenderer(Result<RenderedPage, RenderError>);

    impl PageRenderer for StaticRenderer {
        fn render(&self, _url: &str) -> Result<RenderedPage, RenderError> {
            self.0.clone()
        }
    }

    fn page(stations: &[&str]) -> RenderedPage {
        let mut cells = Vec::new();
        for name in stations {
            cells.push(format!("Station Names {}", name));
            for (label, value) in ["NO2", "O3", "SO2", "CO", "PM10", "PM2.5", "AQHI"].iter().zip(1..) {
                cells.push(format!("{} {}", label, value));
            }
        }
        RenderedPage { cells, timestamp: "(At January 05, 2024 13:30)".to_string() }
    }

    #[test]
    fn test_capture_summarises_snapshot() {
        let mut store = MemoryStore::new();
        let summary = capture(&page(&["Central (Roadside)", "Eastern"]), &mut store, WriteMode::Upsert)
            .expect("valid page should be captured");

        assert_eq!(summary.observation_count, 2);
        assert_eq!(summary.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(summary.hour, 14);
        assert!(summary.unknown_stations.is_empty());
        assert_eq!(summary.missing_stations.len(), 16);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_page_without_stations_is_rejected() {
        let mut store = MemoryStore::new();
        let result = capture(&page(&[]), &mut store, WriteMode::Upsert);
        assert!(matches!(result, Err(PipelineError::Malformed(MalformedInput::NoStations))));
    }

    #[test]
    fn test_malformed_page_writes_nothing() {
        let mut broken = page(&["Central", "Eastern"]);
        broken.cells.pop();

        let mut store = MemoryStore::new();
        let result = capture(&broken, &mut store, WriteMode::Upsert);
        assert!(matches!(result, Err(PipelineError::Malformed(_))));
        assert!(store.is_empty(), "no partial batch may be persisted");
    }

    #[test]
    fn test_render_failure_propagates_as_transient() {
        let renderer = StaticRenderer(Err(RenderError::Http(503)));
        let mut store = MemoryStore::new();
        let err = run_with(&renderer, "https://www.aqhi.gov.hk/en/index.html", &mut store, WriteMode::Upsert)
            .unwrap_err();
        assert!(err.is_transient());
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_station_is_kept_and_reported() {
        let renderer = StaticRenderer(Ok(page(&["Lantau Peak"])));
        let mut store = MemoryStore::new();
        let summary = run_with(&renderer, "unused", &mut store, WriteMode::Upsert).unwrap();
        assert_eq!(summary.unknown_stations, vec!["Lantau Peak".to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_rerun_against_unique_store_conflicts() {
        let renderer = StaticRenderer(Ok(page(&["Central"])));
        let mut store = MemoryStore::with_unique_index(&crate::model::NATURAL_KEY);

        run_with(&renderer, "unused", &mut store, WriteMode::Insert).unwrap();
        let err = run_with(&renderer, "unused", &mut store, WriteMode::Insert).unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::WriteConflict(_))));
    }
}
