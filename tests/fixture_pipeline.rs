/// End-to-end tests over a saved copy of the AQHI list view
///
/// These tests verify:
/// 1. The fixture renderer extracts all 18 station blocks from real-shaped markup
/// 2. Parsed observations carry the snapshot date and end-of-hour
/// 3. Placeholder dashes become "not available"
/// 4. Re-running the same snapshot in upsert mode does not duplicate records
///
/// No network or database is needed.

use std::path::PathBuf;

use aqhi_service::ingest::fixture::FixtureRenderer;
use aqhi_service::ingest::{self, PageRenderer, RendererConfig, RendererKind};
use aqhi_service::model::{NATURAL_KEY, PipelineError, StoreError};
use aqhi_service::parse;
use aqhi_service::pipeline;
use aqhi_service::store::{MemoryStore, ObservationStore, StoreConfig, StoreKind};
use aqhi_service::writer::WriteMode;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/aqhi_list_view.html")
}

fn renderer() -> FixtureRenderer {
    FixtureRenderer::new(fixture_path())
}

fn snapshot_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 17).unwrap()
}

// ---------------------------------------------------------------------------
// Extraction and parsing
// ---------------------------------------------------------------------------

#[test]
fn test_fixture_extracts_eight_cells_per_station() {
    let page = renderer().render(ingest::AQHI_URL).expect("fixture should render");

    assert_eq!(page.cells.len(), 18 * 8);
    assert_eq!(page.cells[0], "Station Names Central/Western");
    assert_eq!(page.cells[1], "NO2 20");
    assert_eq!(page.timestamp, "(At March 17, 2025 08:00)");
}

#[test]
fn test_fixture_parses_all_stations_sorted() {
    let page = renderer().render(ingest::AQHI_URL).unwrap();
    let observations = parse::parse_page(&page).expect("fixture should parse");

    assert_eq!(observations.len(), 18);
    assert!(observations.iter().all(|o| o.date == snapshot_date() && o.hour == 9));

    let stations: Vec<&str> = observations.iter().map(|o| o.station.as_str()).collect();
    let mut sorted = stations.clone();
    sorted.sort();
    assert_eq!(stations, sorted, "observations must be ordered by station");
    assert_eq!(stations.first(), Some(&"Causeway Bay"));
}

#[test]
fn test_roadside_annotation_is_removed() {
    let page = renderer().render(ingest::AQHI_URL).unwrap();
    let observations = parse::parse_page(&page).unwrap();

    let central = observations
        .iter()
        .find(|o| o.station == "Central")
        .expect("roadside Central should be present under its bare name");
    assert_eq!(central.no2, Some(36.0));
    assert_eq!(central.co, Some(0.6));
    assert_eq!(central.pm25, Some(28.0));
    assert_eq!(central.aqhi, Some(4.0));
}

#[test]
fn test_tap_mun_dashes_are_not_available() {
    let page = renderer().render(ingest::AQHI_URL).unwrap();
    let observations = parse::parse_page(&page).unwrap();

    let tap_mun = observations.iter().find(|o| o.station == "Tap Mun").unwrap();
    assert_eq!(tap_mun.no2, None);
    assert_eq!(tap_mun.so2, None);
    assert_eq!(tap_mun.co, None);
    assert_eq!(tap_mun.o3, Some(54.0));
    assert_eq!(tap_mun.aqhi, Some(7.0));
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_rerun_in_upsert_mode_is_idempotent() {
    let mut store = MemoryStore::new();

    let first = pipeline::run_with(&renderer(), ingest::AQHI_URL, &mut store, WriteMode::Upsert)
        .expect("first run should succeed");
    let second = pipeline::run_with(&renderer(), ingest::AQHI_URL, &mut store, WriteMode::Upsert)
        .expect("second run should succeed");

    assert_eq!(first, second);
    assert_eq!(first.observation_count, 18);
    assert!(first.unknown_stations.is_empty());
    assert!(first.missing_stations.is_empty());
    assert_eq!(store.len(), 18, "re-running a snapshot must not duplicate documents");

    let stored = store.find(snapshot_date(), 9).unwrap();
    assert_eq!(stored.len(), 18);
    assert_eq!(stored[0]["station"], "Causeway Bay");
    assert_eq!(stored[0]["date"], "17/03/2025");
}

#[test]
fn test_rerun_in_insert_mode_conflicts_on_unique_store() {
    let mut store = MemoryStore::with_unique_index(&NATURAL_KEY);

    pipeline::run_with(&renderer(), ingest::AQHI_URL, &mut store, WriteMode::Insert).unwrap();
    let err = pipeline::run_with(&renderer(), ingest::AQHI_URL, &mut store, WriteMode::Insert)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Store(StoreError::WriteConflict(_))));
    assert!(!err.is_transient());
    assert_eq!(store.len(), 18);
}

#[test]
fn test_configured_run_with_fixture_and_memory_store() {
    let renderer = RendererConfig {
        kind: RendererKind::Fixture,
        fixture_path: Some(fixture_path()),
        ..Default::default()
    };
    let store = StoreConfig { kind: StoreKind::Memory, ..Default::default() };

    let summary = pipeline::run(&renderer, &store).expect("dry run should succeed");
    assert_eq!(summary.observation_count, 18);
    assert_eq!(summary.date, snapshot_date());
    assert_eq!(summary.hour, 9);
}

#[test]
fn test_truncated_page_is_rejected_before_writing() {
    let mut page = renderer().render(ingest::AQHI_URL).unwrap();
    page.cells.truncate(page.cells.len() - 3);

    let mut store = MemoryStore::new();
    let err = pipeline::capture(&page, &mut store, WriteMode::Upsert).unwrap_err();

    assert!(matches!(err, PipelineError::Malformed(_)));
    assert!(err.to_string().contains("Mong Kok"), "error should name the station: {}", err);
    assert!(store.is_empty());
}
