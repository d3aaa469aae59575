//! Configuration loader implementations.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::schema::LaneConfig;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config `{}`: {source}", .path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON for [`LaneConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but violates a field invariant.
    #[error("invalid config: {reason}")]
    Invalid {
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl LaneConfig {
    /// Parses and validates configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
    /// errors of [`LaneConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        debug!(path = %path.display(), dispatch = ?config.dispatch, "lane config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DispatchMode;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("lane-config-{}-{name}.json", std::process::id()));
        path
    }

    #[test]
    fn empty_object_uses_defaults() {
        let config = LaneConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LaneConfig::default());
        assert_eq!(config.dispatch, DispatchMode::Registry);
        assert!(config.emit_events);
    }

    #[test]
    fn parses_all_fields() {
        let config = LaneConfig::from_json_str(
            r#"{"dispatch": "echo", "emit_events": false, "log_filter": "lane_runner=debug"}"#,
        )
        .unwrap();
        assert_eq!(config.dispatch, DispatchMode::Echo);
        assert!(!config.emit_events);
        assert_eq!(config.log_filter, "lane_runner=debug");
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = LaneConfig::from_json_str(r#"{"timeout_seconds": 5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn blank_filter_rejected() {
        let err = LaneConfig::from_json_str(r#"{"log_filter": "  "}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn loads_from_file() {
        let path = temp_path("load");
        fs::write(&path, r#"{"dispatch": "echo"}"#).unwrap();
        let config = LaneConfig::from_path(&path).unwrap();
        assert_eq!(config, LaneConfig::echo());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_reports_path() {
        let path = temp_path("missing");
        let err = LaneConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { path: p, .. } if p == path));
    }
}
