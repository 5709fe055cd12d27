//! Successful cycles: extraction, documents written, checkpoints advanced.

use checkpoint::{ServiceState, ServiceStateStore, TableCheckpoint};
use iot4ag_sync::testing::fixtures::{self, depth_row, surface_registry, surface_row, ts};
use iot4ag_sync::testing::{MemoryRowSource, MemorySink, MemoryStateStore};
use iot4ag_sync::{CyclePhase, PollerSettings};
use serde_json::json;
use std::sync::Arc;
use sync_core::{MeasurementKind, TableRegistry};

const WATER_DAY: &str = "/bookmarks/iot4ag/soil/water-content/day-index/2024-01-02";
const TEMP_DAY: &str = "/bookmarks/iot4ag/soil/temperature/day-index/2024-01-02";

fn state_at(table: &str, rowtime: &str) -> ServiceState {
    let mut state = ServiceState::with_defaults(1000, [table]);
    state.tables.insert(
        table.to_string(),
        TableCheckpoint {
            lastpoll_rowtime: rowtime.to_string(),
        },
    );
    state
}

// =============================================================================
// Extraction and documents
// =============================================================================

#[tokio::test]
async fn test_row_lands_in_water_and_temperature_documents() {
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "cs_surface",
        [surface_row("2024-01-02T10:00:00Z", "dev-1", 18.4, 22.1)],
    );
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(MemoryStateStore::with_state(state_at(
        "cs_surface",
        "2024-01-01T00:00:00Z",
    )));

    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        sink.clone(),
        store.clone(),
        PollerSettings::default(),
    );
    let report = poller.run_cycle().await.unwrap();

    let queries = source.queries_for("cs_surface");
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].after, Some(ts("2024-01-01T00:00:00Z")));
    assert_eq!(queries[0].limit, 1000);

    let sample_id = "2024-01-02T10:00:00.000Z-dev-1";
    let water = sink.document(WATER_DAY).unwrap();
    assert_eq!(
        water["data"][sample_id],
        json!({
            "time": "2024-01-02T10:00:00.000Z",
            "deviceid": "dev-1",
            "depth": { "value": 2.0, "units": "cm" },
            "vwc": { "value": 18.4, "units": "%" },
        })
    );
    let temperature = sink.document(TEMP_DAY).unwrap();
    assert_eq!(temperature["data"][sample_id]["temperature"]["value"], json!(22.1));
    assert_eq!(temperature["data"][sample_id]["temperature"]["units"], "C");

    let state = store.state().unwrap();
    assert_eq!(
        state.tables["cs_surface"].lastpoll_rowtime,
        "2024-01-02T10:00:00Z"
    );

    assert_eq!(report.documents, 2);
    assert_eq!(report.samples[&MeasurementKind::WaterContent], 1);
    assert_eq!(report.samples[&MeasurementKind::Temperature], 1);
    assert_eq!(report.samples[&MeasurementKind::Conductivity], 0);
    assert_eq!(report.advanced, vec!["cs_surface".to_string()]);
    assert_eq!(poller.phase(), CyclePhase::Checkpointing);
}

#[tokio::test]
async fn test_rows_are_bucketed_by_utc_day() {
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "cs_surface",
        [
            surface_row("2024-01-02T23:59:59.999Z", "dev-1", 18.0, 20.0),
            surface_row("2024-01-03T00:00:00Z", "dev-1", 18.5, 19.5),
            surface_row("2024-01-03T00:15:00+02:00", "dev-2", 17.0, 19.0),
        ],
    );
    let sink = Arc::new(MemorySink::new());
    let mut poller = fixtures::poller(
        surface_registry(),
        source,
        sink.clone(),
        MemoryStateStore::new(),
        PollerSettings::default(),
    );
    poller.run_cycle().await.unwrap();

    // 00:15 at +02:00 is still the 2nd in UTC
    let day2 = sink.document(WATER_DAY).unwrap();
    let ids: Vec<&String> = day2["data"].as_object().unwrap().keys().collect();
    assert_eq!(
        ids,
        vec![
            "2024-01-02T22:15:00.000Z-dev-2",
            "2024-01-02T23:59:59.999Z-dev-1"
        ]
    );
    let day3 = sink
        .document("/bookmarks/iot4ag/soil/water-content/day-index/2024-01-03")
        .unwrap();
    assert_eq!(day3["data"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_depth_column_tables() {
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "soil_temp",
        [depth_row("2024-03-01T12:00:00Z", "sensor-7", 40.0, "temp_c", 11.5)],
    );
    source.insert_rows(
        "soil_moisture",
        [depth_row("2024-03-01T12:00:00Z", "sensor-7", 20.0, "vwc", 31.0)],
    );
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(MemoryStateStore::new());
    let mut poller = fixtures::poller(
        TableRegistry::builtin(),
        source.clone(),
        sink.clone(),
        store.clone(),
        PollerSettings::default(),
    );
    let report = poller.run_cycle().await.unwrap();

    let temp = sink
        .document("/bookmarks/iot4ag/soil/temperature/day-index/2024-03-01")
        .unwrap();
    assert_eq!(
        temp["data"]["2024-03-01T12:00:00.000Z-sensor-7"]["depth"],
        json!({ "value": 40.0, "units": "cm" })
    );

    // Tables are polled serially in registry order
    let order: Vec<String> = source.queries().into_iter().map(|q| q.table).collect();
    assert_eq!(order, vec!["cs_surface", "cs_6layer", "soil_temp", "soil_moisture"]);
    assert_eq!(report.advanced, vec!["soil_temp", "soil_moisture"]);

    let state = store.state().unwrap();
    assert_eq!(state.tables["cs_surface"].lastpoll_rowtime, "");
    assert_eq!(
        state.tables["soil_moisture"].lastpoll_rowtime,
        "2024-03-01T12:00:00Z"
    );
}

#[tokio::test]
async fn test_write_concurrency_writes_every_document() {
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "cs_surface",
        (1..=5).map(|day| surface_row(&format!("2024-01-0{day}T08:00:00Z"), "dev-1", 20.0, 10.0)),
    );
    let sink = Arc::new(MemorySink::new());
    let settings = PollerSettings {
        write_concurrency: 4,
        ..Default::default()
    };
    let mut poller = fixtures::poller(
        surface_registry(),
        source,
        sink.clone(),
        MemoryStateStore::new(),
        settings,
    );
    let report = poller.run_cycle().await.unwrap();

    assert_eq!(report.documents, 10);
    assert_eq!(sink.paths().len(), 10);
}

// =============================================================================
// Checkpoints and service state
// =============================================================================

#[tokio::test]
async fn test_missing_state_is_seeded_with_defaults() {
    let store = Arc::new(MemoryStateStore::new());
    let settings = PollerSettings {
        poll_interval_ms: 2500,
        ..Default::default()
    };
    let mut poller = fixtures::poller(
        TableRegistry::builtin(),
        MemoryRowSource::new(),
        MemorySink::new(),
        store.clone(),
        settings,
    );
    let report = poller.run_cycle().await.unwrap();

    let history = store.history();
    assert_eq!(history.len(), 1, "only the seeded defaults are written");
    let seeded = &history[0];
    assert_eq!(seeded.poll_interval, 2500);
    assert_eq!(
        seeded.tables.keys().collect::<Vec<_>>(),
        vec!["cs_6layer", "cs_surface", "soil_moisture", "soil_temp"]
    );
    assert!(seeded.tables.values().all(|t| t.lastpoll_rowtime.is_empty()));
    assert!(report.advanced.is_empty());
}

#[tokio::test]
async fn test_zero_rows_leaves_state_untouched() {
    let store = Arc::new(MemoryStateStore::with_state(state_at(
        "cs_surface",
        "2024-01-01T00:00:00Z",
    )));
    let sink = Arc::new(MemorySink::new());
    let mut poller = fixtures::poller(
        surface_registry(),
        MemoryRowSource::new(),
        sink.clone(),
        store.clone(),
        PollerSettings::default(),
    );
    let report = poller.run_cycle().await.unwrap();

    assert_eq!(report.total_rows(), 0);
    assert!(sink.put_log().is_empty());
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn test_batches_resume_from_checkpoint() {
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "cs_surface",
        [
            surface_row("2024-01-02T10:00:02Z", "dev-1", 3.0, 3.0),
            surface_row("2024-01-02T10:00:00Z", "dev-1", 1.0, 1.0),
            surface_row("2024-01-02T10:00:01Z", "dev-1", 2.0, 2.0),
        ],
    );
    let store = Arc::new(MemoryStateStore::new());
    let settings = PollerSettings {
        batch_size: 2,
        ..Default::default()
    };
    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        MemorySink::new(),
        store.clone(),
        settings,
    );

    let first = poller.run_cycle().await.unwrap();
    assert_eq!(first.total_rows(), 2);
    assert_eq!(
        store.state().unwrap().tables["cs_surface"].lastpoll_rowtime,
        "2024-01-02T10:00:01Z"
    );

    let second = poller.run_cycle().await.unwrap();
    assert_eq!(second.total_rows(), 1);
    assert_eq!(
        source.queries_for("cs_surface")[1].after,
        Some(ts("2024-01-02T10:00:01Z"))
    );
    assert_eq!(
        store.state().unwrap().tables["cs_surface"].lastpoll_rowtime,
        "2024-01-02T10:00:02Z"
    );

    let third = poller.run_cycle().await.unwrap();
    assert_eq!(third.total_rows(), 0);
}

#[tokio::test]
async fn test_checkpoints_never_move_backwards() {
    let source = Arc::new(MemoryRowSource::new());
    let store = Arc::new(MemoryStateStore::with_state(state_at(
        "cs_surface",
        "2024-06-01T00:00:00.250Z",
    )));
    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        MemorySink::new(),
        store.clone(),
        PollerSettings::default(),
    );

    // Older rows are not selected; rows from before 2020 never count.
    source.insert_rows(
        "cs_surface",
        [
            surface_row("2024-05-31T00:00:00Z", "dev-1", 1.0, 1.0),
            surface_row("2024-06-01T00:00:00.250Z", "dev-1", 1.0, 1.0),
        ],
    );
    poller.run_cycle().await.unwrap();
    assert!(store.history().is_empty());

    source.insert_rows(
        "cs_surface",
        [surface_row("2024-06-01T00:00:00.500Z", "dev-1", 1.0, 1.0)],
    );
    poller.run_cycle().await.unwrap();
    poller.run_cycle().await.unwrap();

    let mut previous = ts("2024-06-01T00:00:00.250Z");
    for state in store.history() {
        let current = state.checkpoint("cs_surface").unwrap().unwrap();
        assert!(current >= previous);
        previous = current;
    }
    assert_eq!(previous, ts("2024-06-01T00:00:00.500Z"));
}

#[tokio::test]
async fn test_rows_before_2020_do_not_advance() {
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "cs_surface",
        [surface_row("2019-12-31T23:59:59Z", "dev-1", 1.0, 1.0)],
    );
    let store = Arc::new(MemoryStateStore::with_state(state_at("cs_surface", "")));
    let sink = Arc::new(MemorySink::new());
    let mut poller = fixtures::poller(
        surface_registry(),
        source,
        sink.clone(),
        store.clone(),
        PollerSettings::default(),
    );
    let report = poller.run_cycle().await.unwrap();

    assert_eq!(report.tables[0].skipped_old, 1);
    assert!(report.advanced.is_empty());
    assert!(sink.put_log().is_empty());
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn test_poll_interval_comes_from_state() {
    let mut state = state_at("cs_surface", "");
    state.poll_interval = 30_000;
    let store = Arc::new(MemoryStateStore::with_state(state));
    let mut poller = fixtures::poller(
        surface_registry(),
        MemoryRowSource::new(),
        MemorySink::new(),
        store.clone(),
        PollerSettings::default(),
    );
    assert_eq!(poller.poll_interval_ms(), 1000);
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.poll_interval_ms, 30_000);
    assert_eq!(poller.poll_interval_ms(), 30_000);

    // A zero interval keeps the previous one
    let mut state = store.state().unwrap();
    state.poll_interval = 0;
    store.write_state(&state).await.unwrap();
    poller.run_cycle().await.unwrap();
    assert_eq!(poller.poll_interval_ms(), 30_000);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "cs_surface",
        [surface_row("2024-01-02T10:00:00Z", "dev-1", 18.4, 22.1)],
    );
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(MemoryStateStore::with_state(state_at("cs_surface", "")));
    let settings = PollerSettings {
        dry_run: true,
        ..Default::default()
    };
    let mut poller = fixtures::poller(
        surface_registry(),
        source,
        sink.clone(),
        store.clone(),
        settings,
    );
    let report = poller.run_cycle().await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.documents, 2);
    assert!(report.advanced.is_empty());
    assert!(sink.put_log().is_empty());
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn test_filesystem_state_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(checkpoint::FilesystemStore::new(dir.path(), "iot4ag2Trellis"));
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "cs_surface",
        [surface_row("2024-01-02T10:00:00Z", "dev-1", 18.4, 22.1)],
    );
    let mut poller = fixtures::poller(
        surface_registry(),
        source,
        MemorySink::new(),
        store.clone(),
        PollerSettings::default(),
    );
    poller.run_cycle().await.unwrap();

    let content = std::fs::read_to_string(store.path()).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(
        stored["tables"]["cs_surface"]["lastpoll_rowtime"],
        "2024-01-02T10:00:00Z"
    );
    assert_eq!(stored["pollInterval"], 1000);
}
