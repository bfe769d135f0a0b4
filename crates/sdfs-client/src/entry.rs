//! File and directory handles.
//!
//! An entry is an immutable `(kind, name, full_path)` triple plus a handle to
//! the dispatcher. It owns no backend resource. Operations never change the
//! entry itself; a copy, move or parent lookup hands back a fresh entry.
//!
//! Every operation comes in two forms:
//!
//! - continuation style: `get_metadata(on_success, on_error)` returns at once
//!   and later runs exactly one of the two callbacks
//! - async style: `metadata().await` resolves to a [`FsResult`]
//!
//! In continuation style a missing success callback (or a missing destination
//! for `copy_to` / `move_to`) drops the call: nothing is sent and neither
//! callback runs.
//!
//! Paths given to [`DirectoryEntry::get_file`] and friends are resolved
//! against the directory they are called on. Malformed paths are still sent;
//! the backend answers them with `EncodingError`.

use std::sync::Arc;

use sdfs_types::{EntryFlags, EntryInfo, EntryKind, Operation, OperationKind, Payload, path};

use crate::dispatch::{Dispatcher, ErrorCallback, SuccessCallback};
use crate::entry_array::EntryArray;
use crate::error::FsResult;
use crate::metadata::Metadata;
use crate::reader::DirectoryReader;

/// Fields and operations shared by both entry kinds.
#[derive(Debug, Clone)]
struct Handle {
    name: String,
    full_path: String,
    dispatcher: Arc<Dispatcher>,
}

impl Handle {
    fn new(full_path: String, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            name: path::leaf_name(&full_path).to_string(),
            full_path,
            dispatcher,
        }
    }

    fn dropped(&self, kind: OperationKind, reason: &str) {
        tracing::debug!(%kind, path = %self.full_path, reason, "call dropped without dispatch");
    }

    fn transfer_op(
        &self,
        kind: OperationKind,
        parent: &DirectoryEntry,
        new_name: Option<&str>,
    ) -> Operation {
        let path = self.full_path.clone();
        let parent = parent.full_path().to_string();
        let new_name = new_name.map(str::to_string);
        match kind {
            OperationKind::Move => Operation::Move {
                path,
                parent,
                new_name,
            },
            _ => Operation::Copy {
                path,
                parent,
                new_name,
            },
        }
    }

    fn get_metadata(
        &self,
        on_success: Option<SuccessCallback<Metadata>>,
        on_error: Option<ErrorCallback>,
    ) {
        let Some(on_success) = on_success else {
            return self.dropped(OperationKind::GetMetadata, "no success callback");
        };
        let op = Operation::GetMetadata {
            path: self.full_path.clone(),
        };
        self.dispatcher
            .dispatch_with(op, to_metadata, on_success, on_error);
    }

    fn transfer_to(
        &self,
        kind: OperationKind,
        parent: Option<&DirectoryEntry>,
        new_name: Option<&str>,
        on_success: Option<SuccessCallback<Entry>>,
        on_error: Option<ErrorCallback>,
    ) {
        let Some(parent) = parent else {
            return self.dropped(kind, "no destination directory");
        };
        let Some(on_success) = on_success else {
            return self.dropped(kind, "no success callback");
        };
        let op = self.transfer_op(kind, parent, new_name);
        let dispatcher = self.dispatcher.clone();
        self.dispatcher.dispatch_with(
            op,
            move |payload| to_entry(payload, &dispatcher),
            on_success,
            on_error,
        );
    }

    fn remove(&self, on_success: Option<SuccessCallback<()>>, on_error: Option<ErrorCallback>) {
        let Some(on_success) = on_success else {
            return self.dropped(OperationKind::Remove, "no success callback");
        };
        let op = Operation::Remove {
            path: self.full_path.clone(),
        };
        self.dispatcher.dispatch_with(op, to_void, on_success, on_error);
    }

    fn get_parent(
        &self,
        on_success: Option<SuccessCallback<DirectoryEntry>>,
        on_error: Option<ErrorCallback>,
    ) {
        let Some(on_success) = on_success else {
            return self.dropped(OperationKind::GetParent, "no success callback");
        };
        let op = Operation::GetParent {
            path: self.full_path.clone(),
        };
        let dispatcher = self.dispatcher.clone();
        self.dispatcher.dispatch_with(
            op,
            move |payload| to_directory(payload, &dispatcher),
            on_success,
            on_error,
        );
    }

    async fn metadata(&self) -> FsResult<Metadata> {
        let op = Operation::GetMetadata {
            path: self.full_path.clone(),
        };
        self.dispatcher.call_with(op, to_metadata).await
    }

    async fn transfer(
        &self,
        kind: OperationKind,
        parent: &DirectoryEntry,
        new_name: Option<&str>,
    ) -> FsResult<Entry> {
        let op = self.transfer_op(kind, parent, new_name);
        self.dispatcher
            .call_with(op, |payload| to_entry(payload, &self.dispatcher))
            .await
    }

    async fn parent(&self) -> FsResult<DirectoryEntry> {
        let op = Operation::GetParent {
            path: self.full_path.clone(),
        };
        self.dispatcher
            .call_with(op, |payload| to_directory(payload, &self.dispatcher))
            .await
    }
}

fn to_metadata(payload: Payload) -> Option<Metadata> {
    match payload {
        Payload::Metadata(info) => Some(info.into()),
        _ => None,
    }
}

fn to_void(payload: Payload) -> Option<()> {
    matches!(payload, Payload::Void).then_some(())
}

fn to_entry(payload: Payload, dispatcher: &Arc<Dispatcher>) -> Option<Entry> {
    match payload {
        Payload::Entry(info) => Some(Entry::from_info(info, dispatcher.clone())),
        _ => None,
    }
}

fn to_file(payload: Payload, dispatcher: &Arc<Dispatcher>) -> Option<FileEntry> {
    match to_entry(payload, dispatcher)? {
        Entry::File(file) => Some(file),
        Entry::Directory(_) => None,
    }
}

fn to_directory(payload: Payload, dispatcher: &Arc<Dispatcher>) -> Option<DirectoryEntry> {
    match to_entry(payload, dispatcher)? {
        Entry::Directory(dir) => Some(dir),
        Entry::File(_) => None,
    }
}

// ============================================================================
// FileEntry
// ============================================================================

/// A file in the sandbox.
#[derive(Debug, Clone)]
pub struct FileEntry {
    handle: Handle,
}

impl FileEntry {
    pub(crate) fn new(full_path: impl Into<String>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            handle: Handle::new(full_path.into(), dispatcher),
        }
    }

    /// Leaf name.
    pub fn name(&self) -> &str {
        &self.handle.name
    }

    /// Absolute sandbox path.
    pub fn full_path(&self) -> &str {
        &self.handle.full_path
    }

    pub fn get_metadata(
        &self,
        on_success: Option<SuccessCallback<Metadata>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle.get_metadata(on_success, on_error)
    }

    /// Duplicate this file into `parent`, as `new_name` or under its own name.
    pub fn copy_to(
        &self,
        parent: Option<&DirectoryEntry>,
        new_name: Option<&str>,
        on_success: Option<SuccessCallback<Entry>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle
            .transfer_to(OperationKind::Copy, parent, new_name, on_success, on_error)
    }

    /// Relocate this file into `parent`. This entry keeps its old path; the
    /// success callback receives the entry at the new location.
    pub fn move_to(
        &self,
        parent: Option<&DirectoryEntry>,
        new_name: Option<&str>,
        on_success: Option<SuccessCallback<Entry>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle
            .transfer_to(OperationKind::Move, parent, new_name, on_success, on_error)
    }

    pub fn remove(&self, on_success: Option<SuccessCallback<()>>, on_error: Option<ErrorCallback>) {
        self.handle.remove(on_success, on_error)
    }

    pub fn get_parent(
        &self,
        on_success: Option<SuccessCallback<DirectoryEntry>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle.get_parent(on_success, on_error)
    }

    pub async fn metadata(&self) -> FsResult<Metadata> {
        self.handle.metadata().await
    }

    pub async fn copy(&self, parent: &DirectoryEntry, new_name: Option<&str>) -> FsResult<Entry> {
        self.handle
            .transfer(OperationKind::Copy, parent, new_name)
            .await
    }

    pub async fn move_into(
        &self,
        parent: &DirectoryEntry,
        new_name: Option<&str>,
    ) -> FsResult<Entry> {
        self.handle
            .transfer(OperationKind::Move, parent, new_name)
            .await
    }

    pub async fn delete(&self) -> FsResult<()> {
        let op = Operation::Remove {
            path: self.handle.full_path.clone(),
        };
        self.handle.dispatcher.call_with(op, to_void).await
    }

    pub async fn parent(&self) -> FsResult<DirectoryEntry> {
        self.handle.parent().await
    }
}

// ============================================================================
// DirectoryEntry
// ============================================================================

/// A directory in the sandbox.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    handle: Handle,
}

impl DirectoryEntry {
    pub(crate) fn new(full_path: impl Into<String>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            handle: Handle::new(full_path.into(), dispatcher),
        }
    }

    /// Leaf name; empty for the root.
    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn full_path(&self) -> &str {
        &self.handle.full_path
    }

    pub fn is_root(&self) -> bool {
        path::is_root(&self.handle.full_path)
    }

    pub fn get_metadata(
        &self,
        on_success: Option<SuccessCallback<Metadata>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle.get_metadata(on_success, on_error)
    }

    /// Recursively duplicate this directory into `parent`.
    pub fn copy_to(
        &self,
        parent: Option<&DirectoryEntry>,
        new_name: Option<&str>,
        on_success: Option<SuccessCallback<Entry>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle
            .transfer_to(OperationKind::Copy, parent, new_name, on_success, on_error)
    }

    pub fn get_parent(
        &self,
        on_success: Option<SuccessCallback<DirectoryEntry>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle.get_parent(on_success, on_error)
    }

    fn get_entry_op(&self, target: &str, kind: EntryKind, flags: EntryFlags) -> Operation {
        let path = if path::is_valid_path(target) {
            path::absolutize(target, &self.handle.full_path)
        } else {
            target.to_string()
        };
        Operation::GetEntry { path, kind, flags }
    }

    /// Look up the file at `target`, relative to this directory unless
    /// absolute. With `flags.create` a missing file is created empty.
    pub fn get_file(
        &self,
        target: &str,
        flags: EntryFlags,
        on_success: Option<SuccessCallback<FileEntry>>,
        on_error: Option<ErrorCallback>,
    ) {
        let Some(on_success) = on_success else {
            return self.handle.dropped(OperationKind::GetEntry, "no success callback");
        };
        let op = self.get_entry_op(target, EntryKind::File, flags);
        let dispatcher = self.handle.dispatcher.clone();
        self.handle.dispatcher.dispatch_with(
            op,
            move |payload| to_file(payload, &dispatcher),
            on_success,
            on_error,
        );
    }

    /// Directory counterpart of [`get_file`](Self::get_file).
    pub fn get_directory(
        &self,
        target: &str,
        flags: EntryFlags,
        on_success: Option<SuccessCallback<DirectoryEntry>>,
        on_error: Option<ErrorCallback>,
    ) {
        let Some(on_success) = on_success else {
            return self.handle.dropped(OperationKind::GetEntry, "no success callback");
        };
        let op = self.get_entry_op(target, EntryKind::Directory, flags);
        let dispatcher = self.handle.dispatcher.clone();
        self.handle.dispatcher.dispatch_with(
            op,
            move |payload| to_directory(payload, &dispatcher),
            on_success,
            on_error,
        );
    }

    /// Remove this directory and everything in it. Fails on the root.
    pub fn remove_recursively(
        &self,
        on_success: Option<SuccessCallback<()>>,
        on_error: Option<ErrorCallback>,
    ) {
        let Some(on_success) = on_success else {
            return self
                .handle
                .dropped(OperationKind::RemoveRecursively, "no success callback");
        };
        let op = Operation::RemoveRecursively {
            path: self.handle.full_path.clone(),
        };
        self.handle
            .dispatcher
            .dispatch_with(op, to_void, on_success, on_error);
    }

    /// A reader over this directory. Purely local; nothing is dispatched.
    pub fn create_reader(&self) -> DirectoryReader {
        DirectoryReader::new(self.handle.full_path.clone(), self.handle.dispatcher.clone())
    }

    pub async fn metadata(&self) -> FsResult<Metadata> {
        self.handle.metadata().await
    }

    pub async fn copy(&self, parent: &DirectoryEntry, new_name: Option<&str>) -> FsResult<Entry> {
        self.handle
            .transfer(OperationKind::Copy, parent, new_name)
            .await
    }

    pub async fn parent(&self) -> FsResult<DirectoryEntry> {
        self.handle.parent().await
    }

    /// List this directory in one call.
    pub async fn entries(&self) -> FsResult<EntryArray> {
        self.create_reader().read().await
    }

    pub async fn file(&self, target: &str, flags: EntryFlags) -> FsResult<FileEntry> {
        let op = self.get_entry_op(target, EntryKind::File, flags);
        let dispatcher = &self.handle.dispatcher;
        dispatcher
            .call_with(op, |payload| to_file(payload, dispatcher))
            .await
    }

    pub async fn directory(&self, target: &str, flags: EntryFlags) -> FsResult<DirectoryEntry> {
        let op = self.get_entry_op(target, EntryKind::Directory, flags);
        let dispatcher = &self.handle.dispatcher;
        dispatcher
            .call_with(op, |payload| to_directory(payload, dispatcher))
            .await
    }

    pub async fn delete_recursively(&self) -> FsResult<()> {
        let op = Operation::RemoveRecursively {
            path: self.handle.full_path.clone(),
        };
        self.handle.dispatcher.call_with(op, to_void).await
    }
}

// ============================================================================
// Entry
// ============================================================================

/// Either kind of entry, as produced by listings and copy/move results.
#[derive(Debug, Clone)]
pub enum Entry {
    File(FileEntry),
    Directory(DirectoryEntry),
}

impl Entry {
    pub(crate) fn from_info(info: EntryInfo, dispatcher: Arc<Dispatcher>) -> Self {
        match info.kind {
            EntryKind::File => Entry::File(FileEntry::new(info.full_path, dispatcher)),
            EntryKind::Directory => {
                Entry::Directory(DirectoryEntry::new(info.full_path, dispatcher))
            }
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::File(_) => EntryKind::File,
            Entry::Directory(_) => EntryKind::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    pub fn name(&self) -> &str {
        self.handle().name.as_str()
    }

    pub fn full_path(&self) -> &str {
        self.handle().full_path.as_str()
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryEntry> {
        match self {
            Entry::Directory(dir) => Some(dir),
            Entry::File(_) => None,
        }
    }

    fn handle(&self) -> &Handle {
        match self {
            Entry::File(file) => &file.handle,
            Entry::Directory(dir) => &dir.handle,
        }
    }

    pub fn get_metadata(
        &self,
        on_success: Option<SuccessCallback<Metadata>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle().get_metadata(on_success, on_error)
    }

    pub fn copy_to(
        &self,
        parent: Option<&DirectoryEntry>,
        new_name: Option<&str>,
        on_success: Option<SuccessCallback<Entry>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle()
            .transfer_to(OperationKind::Copy, parent, new_name, on_success, on_error)
    }

    pub fn get_parent(
        &self,
        on_success: Option<SuccessCallback<DirectoryEntry>>,
        on_error: Option<ErrorCallback>,
    ) {
        self.handle().get_parent(on_success, on_error)
    }

    pub async fn metadata(&self) -> FsResult<Metadata> {
        self.handle().metadata().await
    }

    pub async fn parent(&self) -> FsResult<DirectoryEntry> {
        self.handle().parent().await
    }
}

impl From<FileEntry> for Entry {
    fn from(file: FileEntry) -> Self {
        Entry::File(file)
    }
}

impl From<DirectoryEntry> for Entry {
    fn from(dir: DirectoryEntry) -> Self {
        Entry::Directory(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomError;
    use sdfs_types::link;

    #[tokio::test]
    async fn test_names_follow_paths() {
        let (client, _backend) = link::pair();
        let dispatcher = Dispatcher::spawn(client);

        let file = FileEntry::new("/a/b.txt", dispatcher.clone());
        assert_eq!(file.name(), "b.txt");
        assert_eq!(file.full_path(), "/a/b.txt");

        let root = DirectoryEntry::new("/", dispatcher.clone());
        assert_eq!(root.name(), "");
        assert!(root.is_root());

        let entry = Entry::from_info(EntryInfo::directory("/a"), dispatcher);
        assert!(entry.is_directory());
        assert_eq!(entry.kind(), EntryKind::Directory);
        assert_eq!(entry.name(), "a");
        assert!(entry.as_file().is_none());
    }

    #[tokio::test]
    async fn test_create_reader_snapshots_path() {
        let (client, mut backend) = link::pair();
        let dispatcher = Dispatcher::spawn(client);

        let dir = DirectoryEntry::new("/photos", dispatcher);
        let reader = dir.create_reader();
        drop(dir);
        assert_eq!(reader.full_path(), "/photos");
        assert!(backend.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transfer_carries_destination() {
        let (client, mut backend) = link::pair();
        let dispatcher = Dispatcher::spawn(client);

        let file = FileEntry::new("/a/b.txt", dispatcher.clone());
        let dest = DirectoryEntry::new("/c", dispatcher);
        file.move_to(Some(&dest), Some("d.txt"), Some(Box::new(|_: Entry| {})), None);

        let request = backend.recv().await.unwrap();
        assert_eq!(
            request.op,
            Operation::Move {
                path: "/a/b.txt".into(),
                parent: "/c".into(),
                new_name: Some("d.txt".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_get_entry_paths_resolve_against_directory() {
        let (client, mut backend) = link::pair();
        let dispatcher = Dispatcher::spawn(client);
        let dir = DirectoryEntry::new("/a/b", dispatcher);

        dir.get_file("c.txt", EntryFlags::OPEN, Some(Box::new(|_: FileEntry| {})), None);
        dir.get_directory("../x/", EntryFlags::CREATE, Some(Box::new(|_: DirectoryEntry| {})), None);
        dir.get_file("/abs/./d", EntryFlags::CREATE_NEW, Some(Box::new(|_: FileEntry| {})), None);
        dir.get_file("bad\\name", EntryFlags::OPEN, Some(Box::new(|_: FileEntry| {})), None);

        let paths: Vec<(String, EntryKind, EntryFlags)> = (0..4)
            .map(|_| backend.requests.try_recv().unwrap().op)
            .map(|op| match op {
                Operation::GetEntry { path, kind, flags } => (path, kind, flags),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                ("/a/b/c.txt".to_string(), EntryKind::File, EntryFlags::OPEN),
                ("/a/x".to_string(), EntryKind::Directory, EntryFlags::CREATE),
                ("/abs/d".to_string(), EntryKind::File, EntryFlags::CREATE_NEW),
                ("bad\\name".to_string(), EntryKind::File, EntryFlags::OPEN),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_entry_without_success_callback_is_dropped() {
        let (client, mut backend) = link::pair();
        let dispatcher = Dispatcher::spawn(client);
        let dir = DirectoryEntry::new("/a", dispatcher.clone());

        dir.get_file("c.txt", EntryFlags::OPEN, None, Some(Box::new(|_: DomError| {})));
        dir.get_directory("d", EntryFlags::CREATE, None, None);
        dir.remove_recursively(None, Some(Box::new(|_: DomError| {})));

        assert!(backend.requests.try_recv().is_err());
        assert_eq!(dispatcher.stats().dispatched, 0);
    }
}
