//! The poll loop.

use iot4ag_sync::testing::fixtures::{self, surface_registry, surface_row};
use iot4ag_sync::testing::{MemoryRowSource, MemorySink, MemoryStateStore};
use iot4ag_sync::{CyclePhase, PollerSettings};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_loop_runs_until_max_cycles() {
    let source = Arc::new(MemoryRowSource::new());
    let settings = PollerSettings {
        max_cycles: Some(3),
        ..Default::default()
    };
    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        MemorySink::new(),
        MemoryStateStore::new(),
        settings,
    );

    let cycles = poller.run(std::future::pending::<()>()).await;
    assert_eq!(cycles, 3);
    assert_eq!(source.queries().len(), 3);
    assert_eq!(poller.phase(), CyclePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_failed_cycles() {
    let source = Arc::new(MemoryRowSource::new());
    source.set_unreachable("cs_surface", "connection refused");
    source.insert_rows(
        "cs_surface",
        [surface_row("2024-01-02T10:00:00Z", "dev-1", 18.4, 22.1)],
    );
    let store = Arc::new(MemoryStateStore::new());
    let settings = PollerSettings {
        max_cycles: Some(4),
        ..Default::default()
    };
    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        MemorySink::new(),
        store.clone(),
        settings,
    );

    let cycles = poller.run(std::future::pending::<()>()).await;
    assert_eq!(cycles, 4);
    assert_eq!(source.queries().len(), 4);
    // Only the seeded defaults, nothing ever advanced
    assert_eq!(store.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_loop_sleeps_for_poll_interval() {
    let settings = PollerSettings {
        poll_interval_ms: 60_000,
        max_cycles: Some(3),
        ..Default::default()
    };
    let mut poller = fixtures::poller(
        surface_registry(),
        MemoryRowSource::new(),
        MemorySink::new(),
        MemoryStateStore::new(),
        settings,
    );

    let start = tokio::time::Instant::now();
    poller.run(std::future::pending::<()>()).await;
    // Two sleeps between three cycles
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(120), "slept {elapsed:?}");
    assert!(elapsed < Duration::from_secs(121), "slept {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_the_loop() {
    let source = Arc::new(MemoryRowSource::new());
    let mut poller = fixtures::poller(
        surface_registry(),
        source.clone(),
        MemorySink::new(),
        MemoryStateStore::new(),
        PollerSettings::default(),
    );

    let cycles = poller
        .run(tokio::time::sleep(Duration::from_millis(2500)))
        .await;
    // Cycles at 0s, 1s and 2s; shutdown lands during the third sleep
    assert_eq!(cycles, 3);
    assert_eq!(source.queries().len(), 3);
}
