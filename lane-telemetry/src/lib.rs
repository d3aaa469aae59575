//! Observability utilities for the lane.

#![warn(missing_docs, clippy::pedantic)]

pub mod tracing_support {
    //! Structured tracing helpers.

    use lane_config::LaneConfig;
    use thiserror::Error;
    use tracing_subscriber::EnvFilter;

    /// Errors raised while installing the global subscriber.
    #[derive(Debug, Error)]
    pub enum TelemetryError {
        /// The configured filter directive could not be parsed.
        #[error("invalid log filter `{filter}`: {reason}")]
        InvalidFilter {
            /// The offending directive.
            filter: String,
            /// Parser message.
            reason: String,
        },
        /// A global subscriber was already installed.
        #[error("failed to install tracing subscriber: {reason}")]
        Install {
            /// Reason reported by `tracing-subscriber`.
            reason: String,
        },
    }

    /// Builds the filter: `RUST_LOG` when set, else the configured directive.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFilter`] when the configured
    /// directive is malformed.
    pub fn env_filter(config: &LaneConfig) -> Result<EnvFilter, TelemetryError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        parse_filter(&config.log_filter)
    }

    /// Parses a filter directive such as `info` or `lane_runner=debug`,
    /// ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFilter`] when `directive` is malformed.
    pub fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(directive).map_err(|err| TelemetryError::InvalidFilter {
            filter: directive.to_owned(),
            reason: err.to_string(),
        })
    }

    /// Installs a global `fmt` subscriber driven by [`env_filter`].
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] when the filter is invalid or a subscriber
    /// is already installed.
    pub fn init_tracing(config: &LaneConfig) -> Result<(), TelemetryError> {
        let filter = env_filter(config)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .map_err(|err| TelemetryError::Install {
                reason: err.to_string(),
            })?;
        tracing::debug!(filter = %config.log_filter, "tracing initialised");
        Ok(())
    }

}

pub use tracing_support::{TelemetryError, env_filter, init_tracing, parse_filter};
