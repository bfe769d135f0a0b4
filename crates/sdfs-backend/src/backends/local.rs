//! Local filesystem backend.
//!
//! Provides access to a real directory tree, with path security to prevent
//! escaping the root directory through symlinks.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sdfs_types::path;
use tokio::fs;

use crate::error::{StorageError, StorageResult};
use crate::ops::StorageOps;
use crate::types::{DirEntry, FileAttr, FileType};

/// Local filesystem backend.
///
/// The sandbox root `/` maps to `root`. For example, if `root` is
/// `/media/sdcard`, then `/DCIM/img.jpg` is `/media/sdcard/DCIM/img.jpg`.
///
/// Sandbox paths are normalized before mapping, so `..` can never climb out;
/// symlinks that resolve outside the root are rejected.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    read_only: bool,
}

impl LocalBackend {
    /// Create a backend rooted at the given directory.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root,
            read_only: false,
        }
    }

    /// Create a read-only backend.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            read_only: true,
            ..Self::new(root)
        }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a sandbox path to a host path under the root.
    ///
    /// Returns an error if the path, after following symlinks, lands outside
    /// the root.
    async fn resolve(&self, sandbox: &str) -> StorageResult<PathBuf> {
        let full = path::to_host(&self.root, sandbox);
        if full == self.root {
            return Ok(full);
        }

        // Canonicalize what exists; a missing leaf is checked via its parent.
        let canonical = match fs::canonicalize(&full).await {
            Ok(canonical) => canonical,
            Err(_) => {
                let parent = full
                    .parent()
                    .ok_or_else(|| StorageError::invalid_path(sandbox))?;
                let name = full
                    .file_name()
                    .ok_or_else(|| StorageError::invalid_path(sandbox))?;
                match fs::canonicalize(parent).await {
                    Ok(parent) => parent.join(name),
                    // Parent doesn't exist, will fail on actual operation
                    Err(_) => full.clone(),
                }
            }
        };

        if !canonical.starts_with(&self.root) {
            return Err(StorageError::path_escapes_root(format!(
                "{sandbox} resolves to {}",
                canonical.display()
            )));
        }
        Ok(full)
    }

    /// Check if write operations are allowed.
    fn check_writable(&self) -> StorageResult<()> {
        if self.read_only {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn file_type(ft: std::fs::FileType) -> FileType {
        if ft.is_dir() {
            FileType::Directory
        } else if ft.is_file() {
            FileType::File
        } else {
            FileType::Other
        }
    }

    /// Convert std::fs::Metadata to FileAttr.
    fn metadata_to_attr(meta: &std::fs::Metadata) -> FileAttr {
        FileAttr {
            size: meta.len(),
            kind: Self::file_type(meta.file_type()),
            mtime: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        }
    }

    async fn check_destination(&self, to: &str, to_path: &Path) -> StorageResult<()> {
        let parent = path::parent(to);
        let parent_meta = fs::metadata(self.resolve(&parent).await?)
            .await
            .map_err(|e| StorageError::io(&parent, e))?;
        if !parent_meta.is_dir() {
            return Err(StorageError::not_a_directory(parent));
        }
        if fs::symlink_metadata(to_path).await.is_ok() {
            return Err(StorageError::already_exists(to));
        }
        Ok(())
    }

    /// Copy a tree without recursion: walk a stack of (source, target) pairs.
    async fn copy_tree(&self, from: &Path, to: &Path, sandbox: &str) -> StorageResult<()> {
        let io_err = |e| StorageError::io(sandbox, e);
        let mut stack = vec![(from.to_path_buf(), to.to_path_buf())];
        while let Some((src, dst)) = stack.pop() {
            let meta = fs::metadata(&src).await.map_err(io_err)?;
            if meta.is_dir() {
                fs::create_dir(&dst).await.map_err(io_err)?;
                let mut dir = fs::read_dir(&src).await.map_err(io_err)?;
                while let Some(entry) = dir.next_entry().await.map_err(io_err)? {
                    let ft = entry.file_type().await.map_err(io_err)?;
                    if ft.is_dir() || ft.is_file() {
                        stack.push((entry.path(), dst.join(entry.file_name())));
                    }
                }
            } else {
                fs::copy(&src, &dst).await.map_err(io_err)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageOps for LocalBackend {
    async fn stat(&self, path: &str) -> StorageResult<FileAttr> {
        let full_path = self.resolve(path).await?;
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn read_dir(&self, path: &str) -> StorageResult<Vec<DirEntry>> {
        let full_path = self.resolve(path).await?;
        let io_err = |e| StorageError::io(path, e);
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full_path).await.map_err(io_err)?;

        while let Some(entry) = dir.next_entry().await.map_err(io_err)? {
            let kind = Self::file_type(entry.file_type().await.map_err(io_err)?);
            // Symlinks and special files are not exposed.
            if kind == FileType::Other {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(dir = path, "skipping non-UTF-8 name");
                continue;
            };
            entries.push(DirEntry::new(name, kind));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        self.check_writable()?;
        let from_path = self.resolve(from).await?;
        let to_path = self.resolve(to).await?;
        self.check_destination(to, &to_path).await?;
        self.copy_tree(&from_path, &to_path, from).await
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        self.check_writable()?;
        let from_path = self.resolve(from).await?;
        let to_path = self.resolve(to).await?;
        self.check_destination(to, &to_path).await?;
        fs::rename(&from_path, &to_path)
            .await
            .map_err(|e| StorageError::io(from, e))
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        let meta = fs::symlink_metadata(&full_path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        let result = if meta.is_dir() {
            fs::remove_dir(&full_path).await
        } else {
            fs::remove_file(&full_path).await
        };
        result.map_err(|e| StorageError::io(path, e))
    }

    async fn remove_all(&self, path: &str) -> StorageResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        let meta = fs::symlink_metadata(&full_path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        let result = if meta.is_dir() {
            fs::remove_dir_all(&full_path).await
        } else {
            fs::remove_file(&full_path).await
        };
        result.map_err(|e| StorageError::io(path, e))
    }

    async fn create_file(&self, path: &str) -> StorageResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        self.check_destination(path, &full_path).await?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await
            .map(drop)
            .map_err(|e| StorageError::io(path, e))
    }

    async fn create_dir(&self, path: &str) -> StorageResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;
        self.check_destination(path, &full_path).await?;
        fs::create_dir(&full_path)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    fn read_only(&self) -> bool {
        self.read_only
    }
}
