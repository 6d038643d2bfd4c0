//! Aggregate error type for pipeline stages.
//!
//! Each stage crate defines its own error enum with full context; this type
//! is what the pipeline controller and the binary see. Stage errors convert
//! in via `From` impls living next to their definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for the EPO processor.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation failed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The product catalog could not be fetched or decoded.
    #[error("catalog fetch failed for {url}: {message}")]
    CatalogFetch {
        /// Catalog URL.
        url: String,
        /// Failure detail (HTTP status or decode error).
        message: String,
    },

    /// A file download failed after exhausting retries.
    #[error("download failed for {url}: {message}")]
    Download {
        /// Item URL.
        url: String,
        /// Failure detail.
        message: String,
    },

    /// A downloaded file did not match its manifest checksum.
    #[error("checksum mismatch at {path}: expected {expected}, got {actual}")]
    Checksum {
        /// File on disk.
        path: PathBuf,
        /// Manifest SHA-1, lowercase hex.
        expected: String,
        /// Computed SHA-1, lowercase hex.
        actual: String,
    },

    /// Archive extraction failed.
    #[error("archive error at {path}: {message}")]
    Archive {
        /// Archive or entry path.
        path: PathBuf,
        /// Failure detail.
        message: String,
    },

    /// An XML document could not be parsed.
    #[error("xml parse error in {path}: {message}")]
    XmlParse {
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

    /// The run was cancelled by signal or by a sibling failure.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether this error was a cooperative cancellation rather than a fault.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for EPO processor operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = Error::Checksum {
            path: PathBuf::from("/data/a.zip"),
            expected: "ab".into(),
            actual: "cd".into(),
        };
        let text = err.to_string();
        assert!(text.contains("/data/a.zip"));
        assert!(text.contains("expected ab"));
    }

    #[test]
    fn cancelled_detection() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::CsvWrite("boom".into()).is_cancelled());
    }
}
