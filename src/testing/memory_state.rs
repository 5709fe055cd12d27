//! Service state store kept in memory.

use std::sync::Mutex;

use async_trait::async_trait;
use checkpoint::{ServiceState, ServiceStateStore, StateError};

use super::lock;

/// Holds at most one [`ServiceState`]; empty reads are `NotFound`.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<ServiceState>>,
    history: Mutex<Vec<ServiceState>>,
    read_error: Mutex<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ServiceState) -> Self {
        let store = Self::default();
        *lock(&store.state) = Some(state);
        store
    }

    pub fn state(&self) -> Option<ServiceState> {
        lock(&self.state).clone()
    }

    /// Every state written, oldest first.
    pub fn history(&self) -> Vec<ServiceState> {
        lock(&self.history).clone()
    }

    /// Make reads fail with a backend error.
    pub fn fail_reads(&self, message: &str) {
        *lock(&self.read_error) = Some(message.to_string());
    }
}

#[async_trait]
impl ServiceStateStore for MemoryStateStore {
    async fn read_state(&self) -> Result<ServiceState, StateError> {
        if let Some(message) = lock(&self.read_error).clone() {
            return Err(StateError::Backend(message));
        }
        lock(&self.state)
            .clone()
            .ok_or_else(|| StateError::NotFound("memory".to_string()))
    }

    async fn write_state(&self, state: &ServiceState) -> Result<(), StateError> {
        *lock(&self.state) = Some(state.clone());
        lock(&self.history).push(state.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
