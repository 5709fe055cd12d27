//! DocumentSink trait definition.
//!
//! The poller only needs two operations from the document store: an
//! idempotent put at a path, and a get used to read service state. Both are
//! expressed against a structural template so an implementation can create
//! intermediate nodes with the right types on first write.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::tree::Tree;

/// What a successful put reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutResponse {
    /// Revision of the written resource
    pub rev: Option<String>,
    /// Location of the written content, usable for follow-up metadata writes
    pub content_location: Option<String>,
}

/// Trait for writing documents to the document store.
///
/// # Usage Pattern
///
/// The poller is generic over the sink:
///
/// ```ignore
/// pub async fn write_buckets<S: DocumentSink>(sink: &S, tree: &Tree, ...) -> Result<()> {
///     sink.put(&path, tree, &doc).await?;
/// }
/// ```
///
/// Puts are overwrite-by-key merges: putting the same body twice leaves the
/// store in the same state.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Put `body` at `path`, creating intermediate nodes per `tree`.
    async fn put(&self, path: &str, tree: &Tree, body: &Value) -> Result<PutResponse>;

    /// Get the document at `path`. `Ok(None)` when nothing exists there.
    async fn get(&self, path: &str) -> Result<Option<Value>>;
}

#[async_trait]
impl<T: DocumentSink + ?Sized> DocumentSink for std::sync::Arc<T> {
    async fn put(&self, path: &str, tree: &Tree, body: &Value) -> Result<PutResponse> {
        (**self).put(path, tree, body).await
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        (**self).get(path).await
    }
}
