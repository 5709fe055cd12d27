//! Filesystem-based service state storage implementation.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::state::ServiceState;
use crate::store::{ServiceStateStore, StateError};

/// Filesystem implementation of ServiceStateStore trait.
///
/// Stores the state as `<dir>/<service-name>.json`. Writes go through a
/// temporary file and a rename so a crash never leaves a torn checkpoint.
pub struct FilesystemStore {
    dir: PathBuf,
    service_name: String,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>, service_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            service_name: service_name.into(),
        }
    }

    /// Get the state file path.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.service_name))
    }
}

#[async_trait]
impl ServiceStateStore for FilesystemStore {
    async fn read_state(&self) -> Result<ServiceState, StateError> {
        let path = self.path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateError::NotFound(path.display().to_string()));
            }
            Err(e) => {
                return Err(StateError::Backend(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        serde_json::from_str(&content)
            .map_err(|e| StateError::Invalid(format!("{}: {e}", path.display())))
    }

    async fn write_state(&self, state: &ServiceState) -> Result<(), StateError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            StateError::Backend(format!("failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::Invalid(e.to_string()))?;
        std::fs::write(&tmp, body)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| {
                StateError::Backend(format!("failed to write {}: {e}", path.display()))
            })?;

        tracing::info!("Stored service state to {}", path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path().display().to_string()
    }
}
