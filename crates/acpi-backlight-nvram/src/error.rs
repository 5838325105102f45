//! Error types for boot-variable storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by boot-variable stores.
#[derive(Debug, Error)]
pub enum NvramError {
    /// Filesystem access failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a valid variable map.
    #[error("Corrupt variable store {path}: {source}")]
    Corrupt {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The store rejects writes.
    #[error("Variable store is read-only, cannot write {key}")]
    ReadOnly {
        /// Variable being written.
        key: String,
    },

    /// The stored value cannot be decoded.
    #[error("Variable {key} holds {len} bytes, at most {max} are accepted")]
    Oversized {
        /// Variable name.
        key: String,
        /// Stored length.
        len: usize,
        /// Accepted length.
        max: usize,
    },

    /// The stored value does not fit a 16-bit level.
    #[error("Variable {key} holds {value}, which does not fit 16 bits")]
    OutOfRange {
        /// Variable name.
        key: String,
        /// Decoded value.
        value: u32,
    },

    /// Configuration is invalid.
    #[error("Invalid persistence configuration: {0}")]
    InvalidConfiguration(String),
}

impl NvramError {
    /// Create an I/O error for `path`.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// A specialized `Result` type for boot-variable operations.
pub type NvramResult<T> = std::result::Result<T, NvramError>;
