//! Storage error types and their DOM error names.

use std::io;

use sdfs_types::{ErrorInfo, ErrorName};
use thiserror::Error;

/// Storage error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Storage is read-only.
    #[error("storage is read-only")]
    ReadOnly,

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Path escapes root (security violation).
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Attach a sandbox path to a host I/O error where the kind allows it.
    pub fn io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path.to_string()),
            io::ErrorKind::IsADirectory => Self::IsADirectory(path.to_string()),
            io::ErrorKind::DirectoryNotEmpty => Self::DirectoryNotEmpty(path.to_string()),
            _ => Self::Io(err),
        }
    }

    /// The DOM error name this failure is reported as.
    pub fn error_name(&self) -> ErrorName {
        match self {
            StorageError::NotFound(_) => ErrorName::NotFound,
            StorageError::AlreadyExists(_) => ErrorName::PathExists,
            StorageError::PermissionDenied(_)
            | StorageError::ReadOnly
            | StorageError::DirectoryNotEmpty(_) => ErrorName::NoModificationAllowed,
            StorageError::NotADirectory(_) | StorageError::IsADirectory(_) => {
                ErrorName::TypeMismatch
            }
            StorageError::PathEscapesRoot(_) => ErrorName::Security,
            StorageError::InvalidPath(_) => ErrorName::Encoding,
            StorageError::Io(e) => match e.kind() {
                io::ErrorKind::NotFound => ErrorName::NotFound,
                io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                    ErrorName::NoModificationAllowed
                }
                io::ErrorKind::AlreadyExists => ErrorName::PathExists,
                io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => {
                    ErrorName::QuotaExceeded
                }
                io::ErrorKind::InvalidInput => ErrorName::Encoding,
                _ => ErrorName::Unknown,
            },
        }
    }
}

impl From<StorageError> for ErrorInfo {
    fn from(err: StorageError) -> Self {
        ErrorInfo::new(err.error_name(), err.to_string())
    }
}

/// Storage result type.
pub type StorageResult<T> = Result<T, StorageError>;
