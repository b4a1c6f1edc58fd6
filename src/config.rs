//! App Configuration - Host loop settings.
//!
//! Loaded from TOML:
//!
//! ```toml
//! phases = "FIRST | UPDATE | DRAW | LAST"
//! fixed_delta = 0.016
//! max_frames = 600
//! ```
//!
//! Every key is optional.

use std::path::Path;

use serde::Deserialize;

use crate::types::Phases;

/// Failure to load an [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The TOML was malformed or had the wrong shape.
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was out of range.
    #[error("invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Settings for [`App`](crate::App) and [`FixedStepRunner`](crate::FixedStepRunner).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Frame phases dispatched each frame, in canonical order.
    pub phases: Phases,
    /// Delta seconds the fixed-step runner feeds to `Update`.
    pub fixed_delta: f32,
    /// Stop the fixed-step runner after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            phases: Phases::all(),
            fixed_delta: 1.0 / 60.0,
            max_frames: None,
        }
    }
}

impl AppConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_delta.is_finite() || self.fixed_delta <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "fixed_delta",
                reason: format!("must be a positive number of seconds, got {}", self.fixed_delta),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_parse_phases_and_limits() {
        let config = AppConfig::from_toml_str(
            r#"
            phases = "FIRST | UPDATE | LAST"
            fixed_delta = 0.5
            max_frames = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.phases, Phases::FIRST | Phases::UPDATE | Phases::LAST);
        assert_eq!(config.fixed_delta, 0.5);
        assert_eq!(config.max_frames, Some(3));
    }

    #[test]
    fn test_rejects_non_positive_delta() {
        let err = AppConfig::from_toml_str("fixed_delta = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "fixed_delta", .. }));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = AppConfig::from_toml_str("frames = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AppConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
