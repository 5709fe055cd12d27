//! Document sink abstraction for iot4ag-sync.
//!
//! This crate defines the `DocumentSink` trait the poller writes through,
//! the structural `Tree` that types every level of the bookmark hierarchy,
//! and `TrellisClient`, the HTTP implementation for a Trellis (OADA) store.

mod client;
mod error;
mod path;
mod traits;
mod tree;

pub use client::{base_url, TrellisClient, TrellisConfig};
pub use error::{Result, SinkError};
pub use path::BookmarkPaths;
pub use traits::{DocumentSink, PutResponse};
pub use tree::{ResourceStep, Tree};
