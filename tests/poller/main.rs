//! Poller tests against in-memory sources, sinks and state stores.

mod cycle;
mod failures;
mod schedule;
