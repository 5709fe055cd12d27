//! Read-or-seed and commit of service state.

use tracing::info;

use crate::state::ServiceState;
use crate::store::{ServiceStateStore, StateError};
use crate::watermark::AdvancedWatermark;

/// Wraps a store with the first-run and commit rules.
///
/// - `load` returns the stored state, or persists and returns `defaults` if
///   the store has none.
/// - `commit` writes the state only if at least one watermark advanced.
///
/// # Example
///
/// ```rust,ignore
/// let manager = StateManager::new(store, ServiceState::with_defaults(1000, ["cs_surface"]));
/// let state = manager.load().await?;
/// // ... extract, transform, write ...
/// manager.commit(state, &tracker.advanced()).await?;
/// ```
pub struct StateManager<S: ServiceStateStore> {
    store: S,
    defaults: ServiceState,
}

impl<S: ServiceStateStore> StateManager<S> {
    pub fn new(store: S, defaults: ServiceState) -> Self {
        Self { store, defaults }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn defaults(&self) -> &ServiceState {
        &self.defaults
    }

    /// Read the state, seeding defaults on first run.
    pub async fn load(&self) -> Result<ServiceState, StateError> {
        match self.store.read_state().await {
            Ok(state) => Ok(state),
            Err(StateError::NotFound(location)) => {
                info!(
                    "Service state not present at {}, assuming first poll and storing defaults",
                    location
                );
                self.store.write_state(&self.defaults).await?;
                Ok(self.defaults.clone())
            }
            Err(e) => Err(e),
        }
    }

    /// Persist `state` with `advanced` applied. Returns the state as stored
    /// (unchanged when nothing advanced).
    pub async fn commit(
        &self,
        mut state: ServiceState,
        advanced: &[AdvancedWatermark],
    ) -> Result<ServiceState, StateError> {
        if advanced.is_empty() {
            info!("No table watermarks advanced, service state unchanged");
            return Ok(state);
        }

        state.apply(advanced);
        self.store.write_state(&state).await?;
        for wm in advanced {
            info!(
                "Advanced watermark of {} to {}",
                wm.table, state.tables[&wm.table].lastpoll_rowtime
            );
        }
        Ok(state)
    }
}
