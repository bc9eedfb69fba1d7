//! Error types for poddown
//!
//! Two layers of errors live here:
//! - [`Error`] for everything the library can report (configuration, I/O,
//!   feed parsing, pool submission, integrity checks)
//! - [`TransportError`] for failures reported by a [`Transport`](crate::transport::Transport),
//!   kept separate so the downloader can match on [`TransportError::ResumeRejected`]

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for poddown operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for poddown
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "location.cast_dir")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Transport-level failure while talking to a remote server
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Feed document could not be parsed as RSS or Atom
    #[error("feed parse error: {0}")]
    Feed(String),

    /// Pool is shutting down - not accepting new work
    #[error("shutdown in progress: not accepting new work")]
    ShuttingDown,

    /// Downloaded byte count does not match the advertised size
    #[error("size mismatch for {path}: expected {expected} bytes, got {actual} bytes")]
    SizeMismatch {
        /// The temporary file that was checked
        path: PathBuf,
        /// Size advertised by the feed or the server
        expected: u64,
        /// Size actually present on disk
        actual: u64,
    },
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Errors reported by a transport implementation
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server refused to continue a transfer from a byte offset
    ///
    /// Raised when a ranged request is answered with a whole body instead of
    /// `206 Partial Content`, or with `416 Range Not Satisfiable`. The caller
    /// may retry from offset zero.
    #[error("server rejected resume from byte {offset}")]
    ResumeRejected {
        /// The byte offset that was requested
        offset: u64,
    },

    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The request could not be completed (connect, TLS, timeout, body read)
    #[error("request failed: {0}")]
    Request(String),

    /// Writing the response body to the local sink failed
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransportError::Status(status.as_u16()),
            None => TransportError::Request(err.to_string()),
        }
    }
}

impl TransportError {
    /// Whether this is the resume-specific failure that warrants a fresh retry
    #[must_use]
    pub fn is_resume_rejected(&self) -> bool {
        matches!(self, TransportError::ResumeRejected { .. })
    }
}
