//! iot4ag-sync Library
//!
//! Polls soil-sensor tables in PostgreSQL and publishes their measurements to
//! a Trellis document store as day-bucketed documents, one per measurement
//! kind and UTC day.
//!
//! # Features
//!
//! - Incremental extraction: each table resumes from its stored checkpoint
//! - Idempotent writes: samples are keyed by time and device id
//! - Atomic checkpoints: a cycle advances checkpoints only after every write
//!   succeeded
//!
//! # Crates
//!
//! - `sync_core` - rows, table registry, transformer, error taxonomy
//! - `checkpoint` - service state, watermarks, state stores
//! - `checkpoint_trellis` - service state in the document store
//! - `trellis_sink` - document sink and Trellis client
//! - `iot4ag_sync_postgresql_source` - PostgreSQL extraction
//!
//! # CLI Usage
//!
//! ```bash
//! # Poll forever
//! iot4ag-sync run --trellis-domain trellis.example.com --trellis-token ... \
//!   --old-source-uri postgresql://... --new-source-uri postgresql://...
//!
//! # One cycle without writing
//! iot4ag-sync once --dry-run ...
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sync_core::TableRegistry;

pub mod config;
pub mod poller;
pub mod testing;

pub use poller::{CyclePhase, CycleReport, Poller, PollerSettings, TableReport};

#[derive(Parser, Clone, Debug)]
pub struct TrellisOpts {
    /// Trellis domain or base URL
    #[arg(long, env = "OADA_DOMAIN")]
    pub trellis_domain: String,

    /// Trellis bearer token
    #[arg(long, env = "OADA_TOKEN", hide_env_values = true)]
    pub trellis_token: String,

    /// Bookmark path the measurement documents live under
    #[arg(long, default_value = "iot4ag/soil")]
    pub bookmark_domain: String,

    /// Service name; its state lives at /bookmarks/services/<name>
    #[arg(long, default_value = "iot4ag2Trellis")]
    pub service_name: String,
}

/// Options of the `state` command. Trellis credentials are only needed when
/// the state is read from the document store.
#[derive(Parser, Clone, Debug)]
pub struct StateOpts {
    /// Trellis domain or base URL
    #[arg(long, env = "OADA_DOMAIN")]
    pub trellis_domain: Option<String>,

    /// Trellis bearer token
    #[arg(long, env = "OADA_TOKEN", hide_env_values = true)]
    pub trellis_token: Option<String>,

    /// Bookmark path the measurement documents live under
    #[arg(long, default_value = "iot4ag/soil")]
    pub bookmark_domain: String,

    /// Service name; its state lives at /bookmarks/services/<name>
    #[arg(long, default_value = "iot4ag2Trellis")]
    pub service_name: String,

    /// Read service state from this directory instead of the document store
    #[arg(long)]
    pub state_dir: Option<String>,
}

impl StateOpts {
    pub fn trellis_opts(&self) -> anyhow::Result<TrellisOpts> {
        let trellis_domain = self
            .trellis_domain
            .clone()
            .context("--trellis-domain (or OADA_DOMAIN) is required unless --state-dir is set")?;
        let trellis_token = self
            .trellis_token
            .clone()
            .context("--trellis-token (or OADA_TOKEN) is required unless --state-dir is set")?;
        Ok(TrellisOpts {
            trellis_domain,
            trellis_token,
            bookmark_domain: self.bookmark_domain.clone(),
            service_name: self.service_name.clone(),
        })
    }
}

#[derive(Parser, Clone, Debug)]
pub struct SourceOpts {
    /// Connection string of the "old" PostgreSQL source
    #[arg(long, env = "PG_OLD_URI", hide_env_values = true)]
    pub old_source_uri: Option<String>,

    /// Connection string of the "new" PostgreSQL source
    #[arg(long, env = "PG_NEW_URI", hide_env_values = true)]
    pub new_source_uri: Option<String>,
}

#[derive(Parser, Clone, Debug)]
pub struct PollOpts {
    /// Interval between cycles until the service state sets one
    /// (milliseconds, or with units like "500ms", "30s", "5m", "1h")
    #[arg(long, env = "POLL_INTERVAL", default_value = "1000")]
    pub poll_interval: String,

    /// Rows fetched per table per cycle
    #[arg(long, default_value = "1000")]
    pub batch_size: usize,

    /// Day documents written concurrently
    #[arg(long, default_value = "1")]
    pub write_concurrency: usize,

    /// Stop after this many cycles
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// Dry run mode - extract and transform, but don't write data or checkpoints
    #[arg(long)]
    pub dry_run: bool,

    /// YAML list of table configs replacing the built-in tables
    #[arg(long)]
    pub tables_file: Option<PathBuf>,

    /// Keep service state in this directory instead of the document store
    #[arg(long)]
    pub state_dir: Option<String>,
}

impl PollOpts {
    pub fn settings(&self) -> anyhow::Result<PollerSettings> {
        if self.batch_size == 0 {
            anyhow::bail!("--batch-size must be at least 1");
        }
        let poll_interval_ms = config::parse_duration_to_millis(&self.poll_interval)
            .with_context(|| format!("Invalid poll interval '{}'", self.poll_interval))?;
        Ok(PollerSettings {
            poll_interval_ms,
            batch_size: self.batch_size,
            write_concurrency: self.write_concurrency.max(1),
            max_cycles: self.max_cycles,
            dry_run: self.dry_run,
        })
    }
}

/// The built-in tables, or the ones listed in `tables_file`.
pub fn load_registry(tables_file: Option<&PathBuf>) -> anyhow::Result<TableRegistry> {
    match tables_file {
        Some(path) => TableRegistry::from_file(path)
            .with_context(|| format!("Failed to load table configs from {path:?}")),
        None => Ok(TableRegistry::builtin()),
    }
}
