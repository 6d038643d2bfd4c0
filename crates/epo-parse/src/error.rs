//! Error types for the parse stage.

use std::path::PathBuf;
use thiserror::Error;

/// Parse-stage error.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The XML document is not well-formed.
    #[error("xml parse error in {path}: {message}")]
    Xml {
        /// Source file.
        path: PathBuf,
        /// Parser detail.
        message: String,
    },

    /// A required attribute or element was missing from a document.
    #[error("missing {what} in {path}")]
    MissingAttribute {
        /// Source file.
        path: PathBuf,
        /// What was expected.
        what: String,
    },

    /// Writing or flushing the output CSV failed.
    #[error("csv write error: {0}")]
    CsvWrite(String),

    /// I/O error with path context.
    #[error("I/O error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The run was cancelled.
    #[error("parse cancelled")]
    Cancelled,
}

impl ParseError {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a missing attribute/element error.
    #[must_use]
    pub fn missing(path: impl Into<PathBuf>, what: impl Into<String>) -> Self {
        Self::MissingAttribute {
            path: path.into(),
            what: what.into(),
        }
    }
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        Self::CsvWrite(err.to_string())
    }
}

impl From<ParseError> for epo_core::Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Xml { path, message } => Self::XmlParse { path, message },
            ParseError::MissingAttribute { path, what } => Self::MissingAttribute { path, what },
            ParseError::CsvWrite(message) => Self::CsvWrite(message),
            ParseError::Io { path, message } => Self::Io { path, message },
            ParseError::Cancelled => Self::Cancelled,
        }
    }
}

/// Result type for parse operations.
pub type Result<T> = std::result::Result<T, ParseError>;
