//! Core types for iot4ag-sync.
//!
//! This crate provides the data model shared by the poller crates:
//!
//! - [`RawRow`] / [`RowValue`] - rows as returned by a source query
//! - [`TableConfig`] / [`TableRegistry`] - how source columns map to measurements
//! - [`RowTransformer`] - rows into day-bucketed [`SampleRecord`]s
//! - [`MeasurementBuckets`] - the per-kind day documents of one cycle
//! - [`SyncError`] - the closed set of cycle failures
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── iot4ag-sync-postgresql-source  (produces RawRow)
//!    ├─── trellis-sink                   (writes DayDocument)
//!    └─── iot4ag-sync                    (orchestrates a cycle)
//! ```

pub mod error;
pub mod schema;
pub mod transform;
pub mod types;
pub mod values;

pub use error::{Result, SyncError, SyncErrorKind};
pub use schema::{DataColumn, SourceTag, TableConfig, TableRegistry};
pub use transform::{RowTransformer, TransformSummary, EPOCH_THRESHOLD_YEAR};
pub use types::{
    sample_id, DayDocument, DayIndex, Depth, DepthUnits, MeasurementBuckets, MeasurementKind,
    Quantity, SampleRecord,
};
pub use values::{RawRow, RawRowBuilder, RowValue};
