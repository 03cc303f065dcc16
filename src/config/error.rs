//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Configuration file not found; searched: {searched:?}")]
    FileNotFound { searched: Vec<PathBuf> },

    #[error("Failed to read configuration file {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("Configuration did not parse: {reason}")]
    Parse { reason: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn file_not_found(searched: Vec<PathBuf>) -> Self {
        Self::FileNotFound { searched }
    }

    pub fn file_read(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::FileRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            reason: reason.to_string(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        ConfigurationError::parse(error)
    }
}
