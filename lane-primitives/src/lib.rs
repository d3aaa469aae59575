//! Core shared types for the governed execution lane.

#![warn(missing_docs, clippy::pedantic)]

mod catalog;
mod error;
mod ids;

/// Tool catalog advertised to lane callers.
pub use catalog::{CatalogEntry, ExecutionLane, ToolCatalog, ToolCatalogBuilder};
/// Error type and result alias shared across the lane crates.
pub use error::{Error, Result};
/// Identifiers carried through request and response envelopes.
pub use ids::{EventId, RequestId, RunId, ToolId};
