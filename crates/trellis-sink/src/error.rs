//! Error types for the trellis-sink crate.

use thiserror::Error;

/// Errors that can occur talking to the document store.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Request {method} {path} failed: {message}")]
    Transport {
        method: String,
        path: String,
        message: String,
    },

    #[error("Request {method} {path} returned status {status}")]
    Status {
        method: String,
        path: String,
        status: u16,
    },

    #[error("Invalid document path '{0}'")]
    InvalidPath(String),

    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl SinkError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;
