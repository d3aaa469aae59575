//! Configuration management for the lane runner.
//!
//! Configuration is plain JSON deserialised into [`LaneConfig`]; every field
//! has a default so an empty object is a valid configuration.

#![warn(missing_docs, clippy::pedantic)]

mod schema;

pub mod loader;

pub use loader::{ConfigError, ConfigResult};
pub use schema::{DispatchMode, LaneConfig};
