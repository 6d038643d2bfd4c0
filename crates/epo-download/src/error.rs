//! Error types for catalog and download operations.

use std::path::PathBuf;
use thiserror::Error;

/// Fetch-stage error.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Product catalog could not be fetched or decoded.
    #[error("catalog fetch failed for {url}: {message}")]
    Catalog {
        /// Catalog URL.
        url: String,
        /// HTTP status or decode detail.
        message: String,
    },

    /// Server answered an item request with a non-200 status.
    #[error("unexpected status {status} for {url}")]
    Status {
        /// Item URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Transport-level failure.
    #[error("network error for {url}: {message}")]
    Network {
        /// Item URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Downloaded bytes did not match the manifest checksum.
    #[error("checksum mismatch at {path}: expected {expected}, got {actual}")]
    Checksum {
        /// File on disk.
        path: PathBuf,
        /// Manifest SHA-1, lowercase hex.
        expected: String,
        /// Computed SHA-1, lowercase hex.
        actual: String,
    },

    /// I/O error with path context.
    #[error("I/O error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A descriptor URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The shared HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    Client(String),

    /// The run was cancelled.
    #[error("download cancelled")]
    Cancelled,
}

impl FetchError {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a network error from a reqwest failure.
    #[must_use]
    pub fn network(url: impl Into<String>, err: &reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Whether a retry attempt may succeed. Everything is transient here
    /// except cooperative cancellation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl From<FetchError> for epo_core::Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Catalog { url, message } => Self::CatalogFetch { url, message },
            FetchError::Status { url, status } => Self::Download {
                url,
                message: format!("HTTP status {status}"),
            },
            FetchError::Network { url, message } => Self::Download { url, message },
            FetchError::Checksum {
                path,
                expected,
                actual,
            } => Self::Checksum {
                path,
                expected,
                actual,
            },
            FetchError::Io { path, message } => Self::Io { path, message },
            FetchError::InvalidUrl(message) | FetchError::Client(message) => Self::Download {
                url: String::new(),
                message,
            },
            FetchError::Cancelled => Self::Cancelled,
        }
    }
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
