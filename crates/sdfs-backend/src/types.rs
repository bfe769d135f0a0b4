//! Storage-level node descriptions.

use std::time::SystemTime;

use sdfs_types::EntryKind;

/// Node type as seen by a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Anything else (device, socket, fifo, dangling link).
    Other,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// The entry kind exposed to callers, if this node can be one.
    pub fn entry_kind(&self) -> Option<EntryKind> {
        match self {
            FileType::File => Some(EntryKind::File),
            FileType::Directory => Some(EntryKind::Directory),
            FileType::Other => None,
        }
    }
}

/// Node attributes.
#[derive(Debug, Clone)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    pub kind: FileType,
    /// Last modification time.
    pub mtime: SystemTime,
}

impl FileAttr {
    /// Attributes for a file of `size` bytes, modified now.
    pub fn file(size: u64) -> Self {
        Self {
            size,
            kind: FileType::File,
            mtime: SystemTime::now(),
        }
    }

    /// Attributes for a directory, modified now.
    pub fn directory() -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            mtime: SystemTime::now(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    pub kind: FileType,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}
