//! Failed cycles: nothing is checkpointed and the next cycle retries.

use checkpoint::ServiceState;
use iot4ag_sync::testing::fixtures::{self, surface_registry, surface_row, ts};
use iot4ag_sync::testing::{MemoryRowSource, MemorySink, MemoryStateStore};
use iot4ag_sync::{CyclePhase, PollerSettings};
use std::sync::Arc;
use sync_core::{RawRow, SyncErrorKind};

fn fresh_state() -> ServiceState {
    ServiceState::with_defaults(1000, ["cs_surface"])
}

#[tokio::test]
async fn test_failed_write_keeps_checkpoint_and_retries_same_range() {
    let source = Arc::new(MemoryRowSource::new());
    source.insert_rows(
        "cs_surface",
        [surface_row("2024-01-02T10:00:00Z", "dev-1", 18.4, 22.1)],
    );
    let sink = Arc::new(MemorySink::new());
    sink.fail_puts_containing("/temperature/");
    let store = Arc::new(MemoryStateStore::with_state(fresh_state()));

    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        sink.clone(),
        store.clone(),
        PollerSettings::default(),
    );

    let err = poller.run_cycle().await.unwrap_err();
    assert_eq!(err.kind(), SyncErrorKind::SinkWrite);
    assert!(err.to_string().contains("temperature/day-index/2024-01-02"));
    assert_eq!(poller.phase(), CyclePhase::Writing);
    assert!(store.history().is_empty());
    assert_eq!(store.state().unwrap(), fresh_state());

    sink.clear_failures();
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.advanced, vec!["cs_surface"]);

    let queries = source.queries_for("cs_surface");
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].after, None);
    assert_eq!(queries[1].after, queries[0].after);
    assert_eq!(
        store.state().unwrap().checkpoint("cs_surface").unwrap(),
        Some(ts("2024-01-02T10:00:00Z"))
    );
}

#[tokio::test]
async fn test_unreachable_source_ends_cycle() {
    let source = Arc::new(MemoryRowSource::new());
    source.set_unreachable("cs_surface", "connection refused");
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(MemoryStateStore::with_state(fresh_state()));
    let mut poller = fixtures::poller(
        surface_registry(),
        source,
        sink.clone(),
        store.clone(),
        PollerSettings::default(),
    );

    let err = poller.run_cycle().await.unwrap_err();
    assert_eq!(err.kind(), SyncErrorKind::Connection);
    assert_eq!(poller.phase(), CyclePhase::Extracting { index: 1, total: 1 });
    assert!(sink.put_log().is_empty());
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn test_invalid_row_discards_whole_cycle() {
    let source = Arc::new(MemoryRowSource::new());
    let missing_device = RawRow::builder()
        .column("time", ts("2024-01-02T11:00:00Z"))
        .column("vwc", 18.0)
        .build();
    source.insert_rows(
        "cs_surface",
        [
            surface_row("2024-01-02T10:00:00Z", "dev-1", 18.4, 22.1),
            missing_device,
        ],
    );
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(MemoryStateStore::with_state(fresh_state()));
    let mut poller = fixtures::poller(
        surface_registry(),
        source,
        sink.clone(),
        store.clone(),
        PollerSettings::default(),
    );

    let err = poller.run_cycle().await.unwrap_err();
    assert_eq!(err.kind(), SyncErrorKind::RowValidation);
    assert!(err.to_string().contains("Row 1 of table 'cs_surface'"));
    assert!(sink.put_log().is_empty());
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn test_state_read_failure_ends_cycle() {
    let source = Arc::new(MemoryRowSource::new());
    let store = Arc::new(MemoryStateStore::new());
    store.fail_reads("service unavailable");
    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        MemorySink::new(),
        store.clone(),
        PollerSettings::default(),
    );

    let err = poller.run_cycle().await.unwrap_err();
    assert_eq!(err.kind(), SyncErrorKind::ServiceState);
    assert!(source.queries().is_empty());
    assert!(store.history().is_empty(), "defaults are only seeded on not-found");
}

#[tokio::test]
async fn test_malformed_checkpoint_ends_cycle() {
    let mut state = fresh_state();
    state
        .tables
        .get_mut("cs_surface")
        .unwrap()
        .lastpoll_rowtime = "yesterday".to_string();
    let source = Arc::new(MemoryRowSource::new());
    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        MemorySink::new(),
        MemoryStateStore::with_state(state),
        PollerSettings::default(),
    );

    let err = poller.run_cycle().await.unwrap_err();
    assert_eq!(err.kind(), SyncErrorKind::ServiceState);
    assert!(source.queries().is_empty());
}
