//! Document sink that keeps documents in memory.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use trellis_sink::{DocumentSink, PutResponse, SinkError, Tree};

use super::lock;

/// Merges each put into the stored document the way the document store does
/// (objects merge key by key, everything else is replaced).
#[derive(Default)]
pub struct MemorySink {
    docs: Mutex<BTreeMap<String, Value>>,
    puts: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    revision: Mutex<u64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make puts to any path containing `fragment` fail with status 500.
    pub fn fail_puts_containing(&self, fragment: &str) {
        lock(&self.failing).insert(fragment.to_string());
    }

    pub fn clear_failures(&self) {
        lock(&self.failing).clear();
    }

    pub fn document(&self, path: &str) -> Option<Value> {
        lock(&self.docs).get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        lock(&self.docs).keys().cloned().collect()
    }

    /// Paths of every put attempted, including failed ones.
    pub fn put_log(&self) -> Vec<String> {
        lock(&self.puts).clone()
    }
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn put(&self, path: &str, _tree: &Tree, body: &Value) -> trellis_sink::Result<PutResponse> {
        lock(&self.puts).push(path.to_string());

        if lock(&self.failing).iter().any(|f| path.contains(f.as_str())) {
            return Err(SinkError::Status {
                method: "PUT".to_string(),
                path: path.to_string(),
                status: 500,
            });
        }

        merge(
            lock(&self.docs).entry(path.to_string()).or_insert(Value::Null),
            body,
        );
        let mut revision = lock(&self.revision);
        *revision += 1;
        Ok(PutResponse {
            rev: Some(revision.to_string()),
            content_location: Some(path.to_string()),
        })
    }

    async fn get(&self, path: &str) -> trellis_sink::Result<Option<Value>> {
        Ok(self.document(path))
    }
}
