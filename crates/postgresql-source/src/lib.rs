//! Incremental PostgreSQL extraction for iot4ag-sync.
//!
//! Each cycle runs one bounded query per table:
//!
//! ```sql
//! SELECT * FROM "<table>" WHERE "<time>" > '<checkpoint>' ORDER BY "<time>" ASC LIMIT 1000
//! ```
//!
//! Rows come back with native types (timestamps, numbers, text) converted to
//! [`sync_core::RawRow`].

mod convert;
mod query;
mod source;

pub use convert::convert_row;
pub use query::{quote_ident, PollQuery, DEFAULT_BATCH_SIZE};
pub use source::{new_postgresql_client, PostgresRowSource, PostgresSourceConfig, RowSource};
