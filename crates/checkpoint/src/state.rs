//! Persisted service state.
//!
//! Stored document shape:
//!
//! ```json
//! {
//!     "pollInterval": 30000,
//!     "tables": {
//!         "cs_surface": { "lastpoll_rowtime": "2024-01-02T10:00:00Z" },
//!         "soil_temp": { "lastpoll_rowtime": "" }
//!     }
//! }
//! ```
//!
//! Fields the store adds itself (`_id`, `_rev`, `_type`, ...) are ignored.

use crate::rowtime::{format_rowtime, parse_rowtime};
use crate::store::StateError;
use crate::watermark::AdvancedWatermark;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Poll interval used when nothing else is configured, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Checkpoint entry of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCheckpoint {
    /// Latest committed row time; empty means "poll from epoch"
    #[serde(default)]
    pub lastpoll_rowtime: String,
}

impl TableCheckpoint {
    pub fn at(ts: &DateTime<Utc>) -> Self {
        Self {
            lastpoll_rowtime: format_rowtime(ts),
        }
    }
}

/// Accept any JSON number (or null) as a poll interval. Positive finite
/// values are rounded to whole milliseconds; anything else reads as 0.
fn deserialize_poll_interval<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(match value {
        Some(ms) if ms.is_finite() && ms > 0.0 => ms.round() as u64,
        _ => 0,
    })
}

/// Poll interval plus per-table checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    /// Milliseconds between cycles; 0 means "not set"
    #[serde(default, deserialize_with = "deserialize_poll_interval")]
    pub poll_interval: u64,

    #[serde(default)]
    pub tables: BTreeMap<String, TableCheckpoint>,
}

impl ServiceState {
    /// State seeded on first run: every table polls from epoch.
    pub fn with_defaults<'a>(
        poll_interval: u64,
        tables: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            poll_interval,
            tables: tables
                .into_iter()
                .map(|t| (t.to_string(), TableCheckpoint::default()))
                .collect(),
        }
    }

    /// The committed checkpoint of `table`. Tables absent from the state
    /// poll from epoch.
    pub fn checkpoint(&self, table: &str) -> Result<Option<DateTime<Utc>>, StateError> {
        match self.tables.get(table) {
            Some(entry) => parse_rowtime(&entry.lastpoll_rowtime).map_err(|e| {
                StateError::Invalid(format!("lastpoll_rowtime of table '{table}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Poll interval to use, keeping `previous` when the stored value is zero.
    pub fn effective_poll_interval(&self, previous: u64) -> u64 {
        if self.poll_interval > 0 {
            self.poll_interval
        } else {
            previous
        }
    }

    /// Record advanced watermarks. Tables not in `advanced` keep their entry.
    pub fn apply(&mut self, advanced: &[AdvancedWatermark]) {
        for wm in advanced {
            self.tables
                .insert(wm.table.clone(), TableCheckpoint::at(&wm.current));
        }
    }
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL_MS,
            tables: BTreeMap::new(),
        }
    }
}
