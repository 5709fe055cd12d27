//! Error taxonomy for a poll cycle.
//!
//! Every variant is fatal to the cycle that raised it. The poller logs the
//! error, skips checkpointing and reschedules after the poll interval.

use thiserror::Error;

/// Errors that end a poll cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The source database could not be reached.
    #[error("Failed to connect to {source_tag} source for table '{table}': {message}")]
    Connection {
        source_tag: String,
        table: String,
        message: String,
    },

    /// The extraction query failed after the connection was established.
    #[error("Query failed for table '{table}' ({query}): {message}")]
    Query {
        table: String,
        query: String,
        message: String,
    },

    /// A row carried a missing or malformed time, device id or depth.
    #[error("Row {row_index} of table '{table}' failed validation: {message}")]
    RowValidation {
        table: String,
        row_index: usize,
        message: String,
    },

    /// A document put to the sink failed.
    #[error("Failed to write {path}: {message}")]
    SinkWrite { path: String, message: String },

    /// Service state could not be read or written (not-found is handled
    /// before it reaches this variant).
    #[error("Service state error: {0}")]
    ServiceState(String),

    /// Table configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Discriminant of [`SyncError`], for callers that branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    Connection,
    Query,
    RowValidation,
    SinkWrite,
    ServiceState,
    Config,
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Connection { .. } => SyncErrorKind::Connection,
            Self::Query { .. } => SyncErrorKind::Query,
            Self::RowValidation { .. } => SyncErrorKind::RowValidation,
            Self::SinkWrite { .. } => SyncErrorKind::SinkWrite,
            Self::ServiceState(_) => SyncErrorKind::ServiceState,
            Self::Config(_) => SyncErrorKind::Config,
        }
    }

    pub(crate) fn row(table: &str, row_index: usize, message: impl Into<String>) -> Self {
        Self::RowValidation {
            table: table.to_string(),
            row_index,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connection => "connection",
            Self::Query => "query",
            Self::RowValidation => "row-validation",
            Self::SinkWrite => "sink-write",
            Self::ServiceState => "service-state",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

/// Result type alias for sync-core operations.
pub type Result<T> = std::result::Result<T, SyncError>;
