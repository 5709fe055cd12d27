//! Service state and checkpoint management for iot4ag-sync
//!
//! Tracks, per source table, the latest row time that has been written to
//! the document store (the table's watermark), plus the poll interval.
//!
//! # Architecture
//!
//! - [`ServiceState`] is the persisted document
//! - [`WatermarkTracker`] decides which tables advance after a cycle
//! - [`ServiceStateStore`] abstracts the storage backend
//! - [`StateManager`] adds the read-or-seed and commit rules on top
//!
//! ## Storage Backends
//!
//! - `FilesystemStore` - Stores state as a JSON file
//! - `TrellisStateStore` - Stores state in the document store (in the
//!   checkpoint-trellis crate)

mod config;
mod filesystem;
mod manager;
pub mod rowtime;
mod state;
pub mod store;
mod watermark;


pub use config::StateStorage;
pub use filesystem::FilesystemStore;
pub use manager::StateManager;
pub use rowtime::{format_rowtime, parse_rowtime};
pub use state::{ServiceState, TableCheckpoint, DEFAULT_POLL_INTERVAL_MS};
pub use store::{ServiceStateStore, StateError};
pub use watermark::{should_advance, AdvancedWatermark, WatermarkTracker};
