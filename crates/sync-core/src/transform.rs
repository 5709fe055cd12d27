//! Row transformation: raw source rows into day-bucketed samples.
//!
//! For every row the transformer
//!
//! 1. validates the time and device id columns (a bad row fails the batch),
//! 2. drops rows dated before [`EPOCH_THRESHOLD_YEAR`],
//! 3. derives the UTC day key and millisecond ISO time,
//! 4. emits one sample per numeric data column into that column's bucket.
//!
//! A row can therefore fan out into several measurement kinds. Samples are
//! keyed by `<time>-<deviceid>`, so transforming the same rows again rewrites
//! identical entries instead of adding new ones.

use crate::error::{Result, SyncError};
use crate::schema::{DataColumn, TableConfig};
use crate::types::{Depth, MeasurementBuckets, SampleRecord};
use crate::values::{RawRow, RowValue};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use tracing::debug;

/// Rows dated before this year are treated as sensor clock garbage and
/// skipped.
pub const EPOCH_THRESHOLD_YEAR: i32 = 2020;

/// What a batch contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformSummary {
    /// Rows in the batch
    pub rows: usize,
    /// Rows dropped by the epoch filter
    pub skipped_old: usize,
    /// Sample records emitted (across all kinds)
    pub samples: usize,
    /// Latest timestamp among kept rows
    pub max_time: Option<DateTime<Utc>>,
}

/// Transforms batches for one table.
pub struct RowTransformer<'a> {
    config: &'a TableConfig,
}

impl<'a> RowTransformer<'a> {
    pub fn new(config: &'a TableConfig) -> Self {
        Self { config }
    }

    /// Transform `rows` and merge the samples into `buckets`.
    ///
    /// On error nothing from this batch is merged.
    pub fn transform(
        &self,
        rows: &[RawRow],
        buckets: &mut MeasurementBuckets,
    ) -> Result<TransformSummary> {
        let mut staged = MeasurementBuckets::new();
        let mut summary = TransformSummary {
            rows: rows.len(),
            ..Default::default()
        };

        for (row_index, row) in rows.iter().enumerate() {
            let ts = self.row_time(row_index, row)?;
            let deviceid = self.device_id(row_index, row)?;

            if ts.year() < EPOCH_THRESHOLD_YEAR {
                debug!(
                    "Skipping row {} of {} with very old date {}",
                    row_index,
                    self.config.table,
                    ts.to_rfc3339()
                );
                summary.skipped_old += 1;
                continue;
            }

            let day = ts.format("%Y-%m-%d").to_string();
            let time = ts.to_rfc3339_opts(SecondsFormat::Millis, true);
            if summary.max_time.map_or(true, |max| ts > max) {
                summary.max_time = Some(ts);
            }

            for col in &self.config.data_columns {
                let Some(value) = row.get(&col.column).and_then(RowValue::as_f64) else {
                    continue;
                };
                let depth = self.depth_for(row_index, row, col)?;
                staged.day_mut(col.kind, &day).upsert(SampleRecord {
                    time: time.clone(),
                    deviceid: deviceid.to_string(),
                    depth,
                    kind: col.kind,
                    value,
                });
                summary.samples += 1;
            }
        }

        buckets.merge(staged);
        Ok(summary)
    }

    fn row_time(&self, row_index: usize, row: &RawRow) -> Result<DateTime<Utc>> {
        let column = &self.config.time_column;
        match row.get(column) {
            Some(RowValue::Timestamp(ts)) => Ok(*ts),
            Some(RowValue::Text(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    SyncError::row(
                        &self.config.table,
                        row_index,
                        format!("time column '{column}' ({s:?}) is not a valid timestamp: {e}"),
                    )
                }),
            Some(other) => Err(SyncError::row(
                &self.config.table,
                row_index,
                format!(
                    "time column '{column}' is {} rather than a timestamp",
                    other.type_name()
                ),
            )),
            None => Err(SyncError::row(
                &self.config.table,
                row_index,
                format!("time column '{column}' is missing"),
            )),
        }
    }

    fn device_id<'r>(&self, row_index: usize, row: &'r RawRow) -> Result<&'r str> {
        let column = &self.config.device_id_column;
        match row.get(column) {
            Some(RowValue::Text(s)) if !s.is_empty() => Ok(s),
            Some(other) => Err(SyncError::row(
                &self.config.table,
                row_index,
                format!(
                    "device id column '{column}' must be a non-empty string, got {}",
                    other.type_name()
                ),
            )),
            None => Err(SyncError::row(
                &self.config.table,
                row_index,
                format!("device id column '{column}' is missing"),
            )),
        }
    }

    /// A fixed depth on the column wins; otherwise the row's depth column.
    fn depth_for(&self, row_index: usize, row: &RawRow, col: &DataColumn) -> Result<Depth> {
        let units = self.config.depth_units;
        if let Some(value) = col.depth {
            return Ok(Depth { value, units });
        }
        let Some(depth_column) = &self.config.depth_column else {
            return Err(SyncError::Config(format!(
                "table '{}' column '{}' has neither a fixed depth nor a depth column",
                self.config.table, col.column
            )));
        };
        row.get(depth_column)
            .and_then(RowValue::as_f64)
            .map(|value| Depth { value, units })
            .ok_or_else(|| {
                SyncError::row(
                    &self.config.table,
                    row_index,
                    format!("depth column '{depth_column}' is missing or not numeric"),
                )
            })
    }
}
