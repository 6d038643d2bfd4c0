//! Error types for configuration loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config file {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Config file could not be parsed.
    #[error("cannot parse config file {path}: {message}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Config file has an extension no parser handles.
    #[error("unsupported config format '{extension}' for {path} (expected yaml, json, or toml)")]
    UnsupportedFormat {
        /// File path.
        path: PathBuf,
        /// Offending extension.
        extension: String,
    },

    /// One or more fields failed validation.
    #[error("invalid configuration: {}", issues.join("; "))]
    Invalid {
        /// Human-readable violations, one per field.
        issues: Vec<String>,
    },

    /// Serialization for `config print` failed.
    #[error("cannot serialize configuration: {0}")]
    Serialize(String),
}

impl ConfigError {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for epo_core::Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
