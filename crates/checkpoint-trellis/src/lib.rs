//! Trellis service state storage implementation.
//!
//! This crate provides `TrellisStateStore`, which implements the
//! `ServiceStateStore` trait on top of any `DocumentSink`. The state lives
//! at `/bookmarks/services/<service-name>` next to the data it describes.

use async_trait::async_trait;
use checkpoint::{ServiceState, ServiceStateStore, StateError};
use trellis_sink::{BookmarkPaths, DocumentSink, SinkError, Tree};

/// Document-store implementation of ServiceStateStore trait.
pub struct TrellisStateStore<D: DocumentSink> {
    sink: D,
    tree: Tree,
    path: String,
}

impl<D: DocumentSink> TrellisStateStore<D> {
    /// Create a store for `service_name`. `tree` must type the services path.
    pub fn new(sink: D, tree: Tree, service_name: &str) -> Self {
        Self {
            sink,
            tree,
            path: BookmarkPaths::service(service_name),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn backend(e: SinkError) -> StateError {
    StateError::Backend(e.to_string())
}

#[async_trait]
impl<D: DocumentSink> ServiceStateStore for TrellisStateStore<D> {
    async fn read_state(&self) -> Result<ServiceState, StateError> {
        let doc = match self.sink.get(&self.path).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return Err(StateError::NotFound(self.path.clone())),
            Err(e) if e.is_not_found() => return Err(StateError::NotFound(self.path.clone())),
            Err(e) => return Err(backend(e)),
        };
        serde_json::from_value(doc)
            .map_err(|e| StateError::Invalid(format!("{}: {e}", self.path)))
    }

    async fn write_state(&self, state: &ServiceState) -> Result<(), StateError> {
        let body = serde_json::to_value(state)
            .map_err(|e| StateError::Invalid(format!("failed to encode state: {e}")))?;
        let response = self
            .sink
            .put(&self.path, &self.tree, &body)
            .await
            .map_err(backend)?;
        tracing::debug!(
            "Wrote service state to {} (rev {})",
            self.path,
            response.rev.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.clone()
    }
}
