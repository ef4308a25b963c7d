//! Centralized error types for mailingest.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailingest library.
#[derive(Error, Debug)]
pub enum IngestError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An object key or message path that cannot be used.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The requested message does not exist in the object store.
    #[error("Email not found in store: {0}")]
    MessageNotFound(String),

    /// The message exceeds the configured size limit.
    #[error("Message '{path}' is {size} bytes, limit is {limit}")]
    MessageTooLarge { path: String, size: u64, limit: u64 },

    /// The side-channel metadata of a stored message could not be read.
    #[error("Invalid metadata for '{path}': {reason}")]
    Metadata { path: String, reason: String },

    /// A catalog row could not be written or read back.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A base64 attachment payload is malformed.
    #[error("Failed to decode attachment '{filename}': {source}")]
    Decode {
        filename: String,
        source: base64::DecodeError,
    },

    /// The configured character encoding label is not known.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Convenience alias for `Result<T, IngestError>`.
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
