//! Per-table watermark decisions.
//!
//! A table's checkpoint advances only when the cycle observed a row newer
//! than the committed checkpoint (or there was no checkpoint yet). An empty
//! batch, or a batch whose newest row is not after the checkpoint, leaves
//! the table untouched. Watermarks therefore never move backwards.

use chrono::{DateTime, Utc};

/// A table whose checkpoint moves forward this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedWatermark {
    pub table: String,
    pub previous: Option<DateTime<Utc>>,
    pub current: DateTime<Utc>,
}

/// Whether `observed` should replace `previous`.
pub fn should_advance(previous: Option<DateTime<Utc>>, observed: DateTime<Utc>) -> bool {
    match previous {
        None => true,
        Some(prev) => observed > prev,
    }
}

/// Collects per-table observations during a cycle.
#[derive(Debug, Default)]
pub struct WatermarkTracker {
    observations: Vec<(String, Option<DateTime<Utc>>, Option<DateTime<Utc>>)>,
}

impl WatermarkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the committed checkpoint and the batch maximum of one table.
    pub fn observe(
        &mut self,
        table: impl Into<String>,
        previous: Option<DateTime<Utc>>,
        observed: Option<DateTime<Utc>>,
    ) {
        self.observations.push((table.into(), previous, observed));
    }

    /// Tables whose checkpoint advances, in observation order.
    pub fn advanced(&self) -> Vec<AdvancedWatermark> {
        self.observations
            .iter()
            .filter_map(|(table, previous, observed)| {
                let current = (*observed)?;
                should_advance(*previous, current).then(|| AdvancedWatermark {
                    table: table.clone(),
                    previous: *previous,
                    current,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
