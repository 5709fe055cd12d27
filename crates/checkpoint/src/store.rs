//! Service state storage trait and error type
//!
//! This module defines the ServiceStateStore trait for backend-agnostic
//! state storage operations.

use async_trait::async_trait;
use thiserror::Error;

use crate::state::ServiceState;

/// Errors from a state store.
///
/// `NotFound` is recoverable (first run: seed defaults). Everything else is
/// fatal to the cycle.
#[derive(Error, Debug)]
pub enum StateError {
    /// No state stored yet
    #[error("Service state not found at {0}")]
    NotFound(String),

    /// Stored state exists but cannot be interpreted
    #[error("Invalid service state: {0}")]
    Invalid(String),

    /// The backend failed to read or write
    #[error("Service state backend error: {0}")]
    Backend(String),
}

impl StateError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Trait for service state storage operations.
///
/// Implemented by:
/// - Filesystem storage (`FilesystemStore`)
/// - The document store (`TrellisStateStore` in the checkpoint-trellis crate)
#[async_trait]
pub trait ServiceStateStore: Send + Sync {
    /// Read the stored state.
    ///
    /// Returns `StateError::NotFound` if nothing has been stored yet.
    async fn read_state(&self) -> Result<ServiceState, StateError>;

    /// Replace the stored state.
    async fn write_state(&self, state: &ServiceState) -> Result<(), StateError>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}

#[async_trait]
impl<T: ServiceStateStore + ?Sized> ServiceStateStore for std::sync::Arc<T> {
    async fn read_state(&self) -> Result<ServiceState, StateError> {
        (**self).read_state().await
    }

    async fn write_state(&self, state: &ServiceState) -> Result<(), StateError> {
        (**self).write_state(state).await
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
