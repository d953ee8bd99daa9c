//! Error types for gymlog storage.

use crate::CollectionName;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// All possible errors from the storage layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Input errors
    #[error("invalid collection name: {0:?}")]
    InvalidCollectionName(String),

    // Transient errors
    #[error("i/o error on {}: {message}", path.display())]
    Io {
        path: PathBuf,
        kind: io::ErrorKind,
        message: String,
    },

    // Corruption errors
    #[error("invalid document {}: {reason}", path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("integrity mismatch for {}: expected {expected}, got {actual}", path.display())]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("collection '{collection}' is corrupted: {reason}")]
    CorruptedState {
        collection: CollectionName,
        reason: String,
    },

    // Fatal errors
    #[error("no valid backup for collection '{0}'")]
    NoValidBackup(CollectionName),

    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Persistence {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Wrap an `io::Error` with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, err: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Whether retrying the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Io { .. })
    }

    /// Whether the error means on-disk data failed verification.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::InvalidDocument { .. }
                | Error::IntegrityMismatch { .. }
                | Error::CorruptedState { .. }
        )
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
