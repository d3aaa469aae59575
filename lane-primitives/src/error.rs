//! Shared error definitions for lane primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the lane crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating lane primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided event identifier could not be parsed.
    #[error("invalid event id: {source}")]
    InvalidEventId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Tool identifier failed validation.
    #[error("invalid tool id `{id}`: {reason}")]
    InvalidToolId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Catalog definition failed validation.
    #[error("invalid tool catalog: {reason}")]
    InvalidCatalog {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
