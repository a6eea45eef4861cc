//! Storage error handling
//!
//! Provides typed errors for store operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::encoding::Encoding;

/// Filesystem primitive an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Delete,
    List,
    CreateDirectory,
    Exists,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::CreateDirectory => "create directory",
            Operation::Exists => "check",
        }
    }
}

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create the storage root
    #[error("Failed to create storage directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Storage root previously failed to initialize
    #[error("Storage directory '{path}' is unavailable: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No file at the path
    #[error("File not found: '{path}'")]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to delete file
    #[error("Failed to delete '{path}': {source}")]
    DeleteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to list the storage root
    #[error("Failed to list '{path}': {source}")]
    ListError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Value or file content does not fit the configured encoding
    #[error("Invalid {encoding} data for '{path}': {details}")]
    InvalidEncoding {
        path: PathBuf,
        encoding: Encoding,
        details: String,
    },

    /// Filesystem call exceeded the configured timeout
    #[error("Timed out after {timeout:?} trying to {} '{path}'", .op.as_str())]
    TimedOut {
        op: Operation,
        path: PathBuf,
        timeout: Duration,
    },
}

impl StorageError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, missing, disk
    /// full) and falls back to the variant for `op`.
    pub fn from_io(error: io::Error, path: PathBuf, op: Operation) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound if op != Operation::CreateDirectory => {
                StorageError::NotFound {
                    path,
                    source: error,
                }
            }
            // StorageFull is available but may not be on all platforms
            // Also check for "No space left" in the error message
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => match op {
                Operation::Read | Operation::Exists => StorageError::ReadError {
                    path,
                    source: error,
                },
                Operation::Write => StorageError::WriteError {
                    path,
                    source: error,
                },
                Operation::Delete => StorageError::DeleteError {
                    path,
                    source: error,
                },
                Operation::List => StorageError::ListError {
                    path,
                    source: error,
                },
                Operation::CreateDirectory => StorageError::CreateDirectory {
                    path,
                    source: error,
                },
            },
        }
    }

    /// Whether the target file did not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::TimedOut { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::CreateDirectory { .. } | StorageError::RootUnavailable { .. } => {
                Some("Check that the parent directory exists and you have write permissions, or configure a different storage path.")
            }
            StorageError::TimedOut { .. } => {
                Some("The filesystem is slow or unresponsive. Retry, or raise the configured timeout.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
