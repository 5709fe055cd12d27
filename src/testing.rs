//! In-memory doubles for driving a [`Poller`](crate::poller::Poller) in tests
//!
//! Each double records what it was asked to do and can be told to fail, so
//! tests can assert on queries issued, documents written and checkpoints
//! stored without a database or a document store.
//!

pub mod fixtures;
pub mod memory_sink;
pub mod memory_source;
pub mod memory_state;

pub use memory_sink::MemorySink;
pub use memory_source::MemoryRowSource;
pub use memory_state::MemoryStateStore;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
