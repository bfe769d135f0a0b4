//! The facade entry point.

use std::sync::Arc;

use sdfs_types::{ClientLink, path};

use crate::constants::DEFAULT_FS_NAME;
use crate::dispatch::Dispatcher;
use crate::entry::DirectoryEntry;

/// A named sandboxed filesystem and its root directory.
///
/// The root is built once at construction and the same instance is returned
/// for the lifetime of the filesystem. Entries handed out by operations share
/// this filesystem's dispatcher.
#[derive(Debug)]
pub struct FileSystem {
    name: String,
    root: DirectoryEntry,
    dispatcher: Arc<Dispatcher>,
}

impl FileSystem {
    pub fn new(dispatcher: Arc<Dispatcher>, name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::debug!(%name, "filesystem initialized");
        Self {
            root: DirectoryEntry::new(path::ROOT, dispatcher.clone()),
            name,
            dispatcher,
        }
    }

    /// A filesystem named "SD Card".
    pub fn with_defaults(dispatcher: Arc<Dispatcher>) -> Self {
        Self::new(dispatcher, DEFAULT_FS_NAME)
    }

    /// Spawn a dispatcher over `link` and wrap it.
    pub fn connect(link: ClientLink, name: impl Into<String>) -> Self {
        Self::new(Dispatcher::spawn(link), name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &DirectoryEntry {
        &self.root
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Release this filesystem.
    ///
    /// Requests already dispatched are not cancelled; their callbacks still
    /// run when the backend answers (or disconnects). Returns how many were
    /// outstanding.
    pub fn shutdown(self) -> usize {
        let outstanding = self.dispatcher.pending();
        tracing::debug!(name = %self.name, outstanding, "filesystem shut down");
        outstanding
    }
}
