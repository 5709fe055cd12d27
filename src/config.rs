//! Configuration helpers shared by the CLI.

pub mod duration;

pub use duration::parse_duration_to_millis;
