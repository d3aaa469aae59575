//! Governed execution lane facade.
//!
//! Bundles the lane crates behind feature flags so downstream users can pull
//! in only the components they need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use lane_primitives as primitives;

/// Envelope builder and governed runner (enabled by `runner` feature).
#[cfg(feature = "runner")]
pub use lane_runner as runner;

/// Tool registry and reference tools (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use lane_tools as tools;

/// Runner configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use lane_config as config;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use lane_telemetry as telemetry;
