//! In-memory storage backend.
//!
//! Used for tests and demos. All data is ephemeral.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use parking_lot::RwLock;
use sdfs_types::path;

use crate::error::{StorageError, StorageResult};
use crate::ops::StorageOps;
use crate::types::{DirEntry, FileAttr, FileType};

/// Node in the memory tree.
#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mtime: SystemTime },
    Directory { mtime: SystemTime },
}

impl Node {
    fn attr(&self) -> FileAttr {
        match self {
            Node::File { data, mtime } => FileAttr {
                size: data.len() as u64,
                kind: FileType::File,
                mtime: *mtime,
            },
            Node::Directory { mtime } => FileAttr {
                size: 0,
                kind: FileType::Directory,
                mtime: *mtime,
            },
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }
}

/// In-memory storage backend.
///
/// Nodes are keyed by canonical sandbox path. Thread-safe via an internal
/// `RwLock`; every operation holds the lock for its whole duration, so a
/// copy or rename is atomic with respect to other requests.
#[derive(Debug)]
pub struct MemoryBackend {
    nodes: RwLock<HashMap<String, Node>>,
    read_only: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new tree holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            path::ROOT.to_string(),
            Node::Directory {
                mtime: SystemTime::now(),
            },
        );
        Self {
            nodes: RwLock::new(nodes),
            read_only: false,
        }
    }

    /// Reject every modification from now on.
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Create a directory and any missing ancestors.
    pub fn create_dir_all(&self, dir: &str) -> StorageResult<()> {
        let dir = path::normalize(dir);
        let mut nodes = self.nodes.write();
        Self::ensure_dirs(&mut nodes, &dir)
    }

    /// Create or overwrite a file, creating any missing ancestors.
    pub fn write_file(&self, file: &str, data: impl Into<Vec<u8>>) -> StorageResult<()> {
        let file = path::normalize(file);
        if path::is_root(&file) {
            return Err(StorageError::IsADirectory(file));
        }
        let mut nodes = self.nodes.write();
        Self::ensure_dirs(&mut nodes, &path::parent(&file))?;
        if nodes.get(&file).is_some_and(Node::is_dir) {
            return Err(StorageError::IsADirectory(file));
        }
        nodes.insert(
            file,
            Node::File {
                data: data.into(),
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    /// Contents of a file.
    pub fn read_file(&self, file: &str) -> StorageResult<Vec<u8>> {
        let file = path::normalize(file);
        match self.nodes.read().get(&file) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Directory { .. }) => Err(StorageError::IsADirectory(file)),
            None => Err(StorageError::not_found(file)),
        }
    }

    fn ensure_dirs(nodes: &mut HashMap<String, Node>, dir: &str) -> StorageResult<()> {
        let mut current = String::new();
        for segment in path::split(dir) {
            let base = if current.is_empty() { path::ROOT } else { current.as_str() };
            current = path::join(base, segment);
            match nodes.get(&current) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => return Err(StorageError::not_a_directory(current)),
                None => {
                    nodes.insert(
                        current.clone(),
                        Node::Directory {
                            mtime: SystemTime::now(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.read_only {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Check `to` can be created: parent is an existing directory, `to` is free.
    fn check_destination(nodes: &HashMap<String, Node>, to: &str) -> StorageResult<()> {
        let parent = path::parent(to);
        match nodes.get(&parent) {
            Some(Node::Directory { .. }) => {}
            Some(Node::File { .. }) => return Err(StorageError::not_a_directory(parent)),
            None => return Err(StorageError::not_found(parent)),
        }
        if nodes.contains_key(to) {
            return Err(StorageError::already_exists(to));
        }
        Ok(())
    }

    /// `from` and every node below it, with their paths rebased onto `to`.
    fn subtree(
        nodes: &HashMap<String, Node>,
        from: &str,
        to: &str,
    ) -> StorageResult<Vec<(String, String, Node)>> {
        let Some(node) = nodes.get(from) else {
            return Err(StorageError::not_found(from));
        };
        let mut moved = vec![(from.to_string(), to.to_string(), node.clone())];
        if node.is_dir() {
            for (key, child) in nodes.iter() {
                if path::is_parent_of(from, key) {
                    let rebased = format!("{to}{}", &key[from.len()..]);
                    moved.push((key.clone(), rebased, child.clone()));
                }
            }
        }
        Ok(moved)
    }
}

#[async_trait]
impl StorageOps for MemoryBackend {
    async fn stat(&self, path: &str) -> StorageResult<FileAttr> {
        self.nodes
            .read()
            .get(path)
            .map(Node::attr)
            .ok_or_else(|| StorageError::not_found(path))
    }

    async fn read_dir(&self, dir: &str) -> StorageResult<Vec<DirEntry>> {
        let nodes = self.nodes.read();
        match nodes.get(dir) {
            Some(Node::Directory { .. }) => {}
            Some(Node::File { .. }) => return Err(StorageError::not_a_directory(dir)),
            None => return Err(StorageError::not_found(dir)),
        }

        let mut result: Vec<DirEntry> = nodes
            .iter()
            .filter(|(key, _)| !path::is_root(key) && path::parent(key) == dir)
            .map(|(key, node)| {
                let kind = if node.is_dir() {
                    FileType::Directory
                } else {
                    FileType::File
                };
                DirEntry::new(path::leaf_name(key), kind)
            })
            .collect();

        // Sort for consistent ordering
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut nodes = self.nodes.write();
        Self::check_destination(&nodes, to)?;
        let now = SystemTime::now();
        for (_, target, node) in Self::subtree(&nodes, from, to)? {
            let node = match node {
                Node::File { data, .. } => Node::File { data, mtime: now },
                Node::Directory { .. } => Node::Directory { mtime: now },
            };
            nodes.insert(target, node);
        }
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut nodes = self.nodes.write();
        Self::check_destination(&nodes, to)?;
        for (source, target, node) in Self::subtree(&nodes, from, to)? {
            nodes.remove(&source);
            nodes.insert(target, node);
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut nodes = self.nodes.write();
        match nodes.get(path) {
            Some(Node::Directory { .. }) => {
                if nodes.keys().any(|key| path::is_parent_of(path, key)) {
                    return Err(StorageError::directory_not_empty(path));
                }
            }
            Some(Node::File { .. }) => {}
            None => return Err(StorageError::not_found(path)),
        }
        nodes.remove(path);
        Ok(())
    }

    async fn remove_all(&self, path: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut nodes = self.nodes.write();
        if nodes.remove(path).is_none() {
            return Err(StorageError::not_found(path));
        }
        nodes.retain(|key, _| !path::is_parent_of(path, key));
        Ok(())
    }

    async fn create_file(&self, path: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut nodes = self.nodes.write();
        Self::check_destination(&nodes, path)?;
        nodes.insert(
            path.to_string(),
            Node::File {
                data: Vec::new(),
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn create_dir(&self, path: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut nodes = self.nodes.write();
        Self::check_destination(&nodes, path)?;
        nodes.insert(
            path.to_string(),
            Node::Directory {
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn read_only(&self) -> bool {
        self.read_only
    }
}
