//! Strongly typed configuration schema.

use serde::{Deserialize, Serialize};

use crate::loader::{ConfigError, ConfigResult};

/// How the runner turns a request into a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Echo the request input without invoking any tool.
    Echo,
    /// Route the request to the tool registered under its `tool_id`.
    #[default]
    Registry,
}

/// Top-level runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaneConfig {
    /// Dispatch strategy.
    pub dispatch: DispatchMode,
    /// Whether run events are forwarded to the configured sink.
    pub emit_events: bool,
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::default(),
            emit_events: true,
            log_filter: "info".to_owned(),
        }
    }
}

impl LaneConfig {
    /// Returns a configuration that keeps the echo behaviour.
    #[must_use]
    pub fn echo() -> Self {
        Self {
            dispatch: DispatchMode::Echo,
            ..Self::default()
        }
    }

    /// Checks field-level invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the log filter is blank.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "log_filter cannot be empty".into(),
            });
        }
        Ok(())
    }
}
