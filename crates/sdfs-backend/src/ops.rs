//! Storage operations trait.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{DirEntry, FileAttr};

/// What the service needs from a storage backend.
///
/// All paths are canonical sandbox paths (`/` is the backend's root, no `.`,
/// `..` or trailing separators). Policy (which copies are allowed, what the
/// root may not do) lives in the service; backends only do the I/O.
#[async_trait]
pub trait StorageOps: Send + Sync {
    /// Get node attributes.
    async fn stat(&self, path: &str) -> StorageResult<FileAttr>;

    /// List a directory, sorted by name.
    async fn read_dir(&self, path: &str) -> StorageResult<Vec<DirEntry>>;

    /// Duplicate `from` (recursively for directories) as `to`.
    ///
    /// `to` must not exist and its parent must be a directory.
    async fn copy(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Relocate `from` to `to`. Same preconditions as [`copy`](Self::copy).
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Remove a file or an empty directory.
    async fn remove(&self, path: &str) -> StorageResult<()>;

    /// Remove a file, or a directory and everything below it.
    async fn remove_all(&self, path: &str) -> StorageResult<()>;

    /// Create an empty file. `path` must not exist and its parent must be a
    /// directory.
    async fn create_file(&self, path: &str) -> StorageResult<()>;

    /// Create an empty directory. Same preconditions as
    /// [`create_file`](Self::create_file).
    async fn create_dir(&self, path: &str) -> StorageResult<()>;

    /// Returns true if this storage rejects modification.
    fn read_only(&self) -> bool;

    /// Check if a path exists.
    async fn exists(&self, path: &str) -> bool {
        self.stat(path).await.is_ok()
    }

    /// Returns true if `path` is a directory with no children.
    async fn is_empty_dir(&self, path: &str) -> StorageResult<bool> {
        Ok(self.read_dir(path).await?.is_empty())
    }
}
