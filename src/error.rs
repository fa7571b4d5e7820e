//! Error types for the media reconciler

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Error kinds that can occur during a reconciliation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileErrorKind {
    /// Permission denied when accessing a file or directory
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// I/O error during file operations
    IoError,
    /// Database operation failed
    DatabaseError,
    /// Hash computation failed
    HashError,
    /// Invalid path encoding
    InvalidPath,
    /// Unknown error
    Unknown,
}

/// Represents an error that occurred during reconciliation
#[derive(Debug, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct ReconcileError {
    /// The kind of error
    pub kind: ReconcileErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl ReconcileError {
    /// Create a new error
    pub fn new(
        kind: ReconcileErrorKind,
        path: Option<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(path: PathBuf) -> Self {
        Self::new(
            ReconcileErrorKind::NotFound,
            Some(path.clone()),
            format!("Not found: {:?}", path),
        )
    }

    /// Create an I/O error
    pub fn io_error(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ReconcileErrorKind::IoError, path, message)
    }

    /// Create a database error
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ReconcileErrorKind::DatabaseError, None, message)
    }

    /// Create a hash computation error
    pub fn hash_error(path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(ReconcileErrorKind::HashError, Some(path), message)
    }
}

impl From<std::io::Error> for ReconcileError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ReconcileErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => ReconcileErrorKind::NotFound,
            _ => ReconcileErrorKind::IoError,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<rusqlite::Error> for ReconcileError {
    fn from(err: rusqlite::Error) -> Self {
        Self::database_error(err.to_string())
    }
}
