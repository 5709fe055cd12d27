//! The poll cycle.
//!
//! One cycle walks `Idle → Extracting → Writing → Checkpointing → Sleeping`:
//!
//! 1. read (or seed) the service state and take the poll interval from it
//! 2. query every registered table serially from its checkpoint and bucket
//!    the rows by measurement kind and day
//! 3. put every day document to the sink
//! 4. store the advanced checkpoints, only when every put succeeded
//!
//! Any failure ends the cycle before checkpointing. [`Poller::run`] logs it
//! and sleeps for the current interval; it never exits on a cycle failure.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use checkpoint::{ServiceState, ServiceStateStore, StateError, StateManager, WatermarkTracker};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use iot4ag_sync_postgresql_source::{PollQuery, RowSource, DEFAULT_BATCH_SIZE};
use sync_core::{MeasurementBuckets, MeasurementKind, RowTransformer, SyncError, TableRegistry};
use tracing::{debug, error, info};
use trellis_sink::{BookmarkPaths, DocumentSink, Tree};

/// Where a poller is within its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    /// Extracting table `index` (1-based) of `total`
    Extracting {
        index: usize,
        total: usize,
    },
    Writing,
    Checkpointing,
    Sleeping,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Extracting { index, total } => write!(f, "extracting {index}/{total}"),
            Self::Writing => write!(f, "writing"),
            Self::Checkpointing => write!(f, "checkpointing"),
            Self::Sleeping => write!(f, "sleeping"),
        }
    }
}

/// Settings of a poller that do not come from the service state.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Interval used until the service state provides one, in milliseconds
    pub poll_interval_ms: u64,
    pub batch_size: usize,
    /// Day documents put concurrently
    pub write_concurrency: usize,
    /// Stop after this many cycles; `None` runs until shutdown
    pub max_cycles: Option<u64>,
    /// Extract and transform only
    pub dry_run: bool,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: checkpoint::DEFAULT_POLL_INTERVAL_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            write_concurrency: 1,
            max_cycles: None,
            dry_run: false,
        }
    }
}

/// Extraction result of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub table: String,
    pub rows: usize,
    pub skipped_old: usize,
    pub samples: usize,
    pub max_time: Option<DateTime<Utc>>,
}

/// What one successful cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub tables: Vec<TableReport>,
    pub samples: BTreeMap<MeasurementKind, usize>,
    /// Day documents written (or, in a dry run, that would have been)
    pub documents: usize,
    /// Tables whose checkpoint moved forward
    pub advanced: Vec<String>,
    /// Interval the next sleep uses, in milliseconds
    pub poll_interval_ms: u64,
    pub dry_run: bool,
}

impl CycleReport {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

fn state_error(e: StateError) -> SyncError {
    SyncError::ServiceState(e.to_string())
}

/// Polls the registered tables and publishes their samples.
pub struct Poller<R: RowSource, D: DocumentSink, S: ServiceStateStore> {
    registry: TableRegistry,
    source: R,
    sink: D,
    state: StateManager<S>,
    tree: Tree,
    paths: BookmarkPaths,
    settings: PollerSettings,
    poll_interval_ms: u64,
    phase: CyclePhase,
}

impl<R: RowSource, D: DocumentSink, S: ServiceStateStore> Poller<R, D, S> {
    /// Create a poller. When the store holds no state yet, the first cycle
    /// seeds one with every registered table at an empty checkpoint.
    pub fn new(
        registry: TableRegistry,
        source: R,
        sink: D,
        store: S,
        tree: Tree,
        paths: BookmarkPaths,
        settings: PollerSettings,
    ) -> Self {
        let defaults =
            ServiceState::with_defaults(settings.poll_interval_ms, registry.table_names());
        Self {
            registry,
            source,
            sink,
            state: StateManager::new(store, defaults),
            tree,
            paths,
            poll_interval_ms: settings.poll_interval_ms,
            settings,
            phase: CyclePhase::Idle,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Interval the poller sleeps between cycles, in milliseconds.
    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn store(&self) -> &S {
        self.state.store()
    }

    fn enter(&mut self, phase: CyclePhase) {
        debug!("Poller phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Run a single cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, SyncError> {
        self.enter(CyclePhase::Idle);
        let state = self.state.load().await.map_err(state_error)?;
        self.poll_interval_ms = state.effective_poll_interval(self.poll_interval_ms);

        let mut report = CycleReport {
            poll_interval_ms: self.poll_interval_ms,
            dry_run: self.settings.dry_run,
            ..Default::default()
        };

        // Extracting
        let mut buckets = MeasurementBuckets::new();
        let mut tracker = WatermarkTracker::new();
        let total = self.registry.len();
        for index in 0..total {
            self.enter(CyclePhase::Extracting {
                index: index + 1,
                total,
            });
            let config = &self.registry.tables()[index];
            let after = state.checkpoint(&config.table).map_err(state_error)?;
            let query = PollQuery::new(config, after, self.settings.batch_size);
            info!(
                "Polling {} from {}",
                config.table,
                after.map_or_else(|| "epoch".to_string(), |ts| ts.to_rfc3339())
            );

            let rows = self.source.fetch_rows(&query).await?;
            let summary = RowTransformer::new(config).transform(&rows, &mut buckets)?;
            info!(
                "Table {}: {} rows, {} samples, {} skipped as too old",
                config.table, summary.rows, summary.samples, summary.skipped_old
            );

            tracker.observe(config.table.as_str(), after, summary.max_time);
            report.tables.push(TableReport {
                table: config.table.clone(),
                rows: summary.rows,
                skipped_old: summary.skipped_old,
                samples: summary.samples,
                max_time: summary.max_time,
            });
        }

        for kind in MeasurementKind::ALL {
            report.samples.insert(kind, buckets.sample_count(kind));
        }
        report.documents = buckets.document_count();

        if self.settings.dry_run {
            for (kind, day, doc) in buckets.documents() {
                info!(
                    "Dry run: would put {} samples to {}",
                    doc.len(),
                    self.paths.day_index(kind, day)
                );
            }
            info!("Dry run: skipping writes and checkpointing");
            return Ok(report);
        }

        // Writing
        self.enter(CyclePhase::Writing);
        self.write_buckets(&buckets).await?;

        // Checkpointing
        self.enter(CyclePhase::Checkpointing);
        let advanced = tracker.advanced();
        self.state
            .commit(state, &advanced)
            .await
            .map_err(state_error)?;
        report.advanced = advanced.into_iter().map(|wm| wm.table).collect();

        Ok(report)
    }

    /// Put every day document. Fails on the first failed put; the caller
    /// then skips checkpointing, so a partially written set is rewritten in
    /// full by the next cycle.
    async fn write_buckets(&self, buckets: &MeasurementBuckets) -> Result<(), SyncError> {
        let mut puts = Vec::with_capacity(buckets.document_count());
        for (kind, day, doc) in buckets.documents() {
            let path = self.paths.day_index(kind, day);
            let body = serde_json::to_value(doc).map_err(|e| SyncError::SinkWrite {
                path: path.clone(),
                message: format!("failed to encode document: {e}"),
            })?;
            puts.push((path, body, doc.len()));
        }

        let total = puts.len();
        let sink = &self.sink;
        let tree = &self.tree;
        stream::iter(puts)
            .map(|(path, body, samples)| async move {
                info!("Putting {samples} samples to {path}");
                sink.put(&path, tree, &body)
                    .await
                    .map_err(|e| SyncError::SinkWrite {
                        path: path.clone(),
                        message: e.to_string(),
                    })
            })
            .buffer_unordered(self.settings.write_concurrency.max(1))
            .try_collect::<Vec<_>>()
            .await?;

        info!("Successfully put a total of {total} day documents");
        Ok(())
    }

    /// Run cycles until `max_cycles` is reached or `shutdown` resolves.
    ///
    /// Returns the number of cycles run.
    pub async fn run<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0u64;
        loop {
            cycles += 1;
            match self.run_cycle().await {
                Ok(report) => info!(
                    "Cycle {cycles} complete: {} rows, {} documents, advanced [{}]",
                    report.total_rows(),
                    report.documents,
                    report.advanced.join(", ")
                ),
                Err(e) => error!(
                    kind = %e.kind(),
                    "Cycle {cycles} failed in phase {}: {e}",
                    self.phase
                ),
            }

            if self.settings.max_cycles.is_some_and(|max| cycles >= max) {
                info!("Reached {cycles} cycles, stopping");
                break;
            }

            self.enter(CyclePhase::Sleeping);
            let interval = Duration::from_millis(self.poll_interval_ms);
            debug!("Sleeping {interval:?} before next poll");
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping after {cycles} cycles");
                    break;
                }
            }
        }
        self.enter(CyclePhase::Idle);
        cycles
    }
}
