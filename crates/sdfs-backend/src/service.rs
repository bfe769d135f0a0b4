//! The privileged side of the link: turns requests into storage calls.
//!
//! ```text
//!   BackendLink.requests ──▶ Service::run ──spawn──▶ handle(op) ──▶ StorageOps
//!                                                        │
//!   BackendLink.replies  ◀────────── Reply{id, outcome} ─┘
//! ```
//!
//! Each request runs on its own task, so replies come back in completion
//! order, not request order. All sandbox policy (root protection, copy/move
//! rules, name validation) is enforced here; backends only do the I/O.

use std::sync::Arc;

use sdfs_types::{
    BackendLink, EntryFlags, EntryInfo, EntryKind, ErrorInfo, MetadataInfo, Operation, Payload,
    Reply, path,
};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::StorageError;
use crate::ops::StorageOps;
use crate::types::FileType;

type OpResult = Result<Payload, ErrorInfo>;

/// Executes requests against a storage backend.
#[derive(Clone)]
pub struct Service {
    storage: Arc<dyn StorageOps>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("read_only", &self.storage.read_only())
            .finish()
    }
}

impl Service {
    pub fn new(storage: Arc<dyn StorageOps>) -> Self {
        Self { storage }
    }

    /// Serve `link` until the facade hangs up.
    ///
    /// The returned task finishes once every sender of the request channel is
    /// gone; requests already in flight still get their replies.
    pub fn spawn(self, link: BackendLink) -> JoinHandle<()> {
        tokio::spawn(self.run(link))
    }

    #[tracing::instrument(level = "debug", name = "service", skip_all)]
    pub async fn run(self, mut link: BackendLink) {
        while let Some(request) = link.recv().await {
            let service = self.clone();
            let replies = link.replies.clone();
            let span = tracing::debug_span!("request", id = %request.id, kind = %request.op.kind());
            tokio::spawn(
                async move {
                    let outcome = service.handle(request.op).await;
                    if let Err(err) = &outcome {
                        tracing::warn!(error = %err, "request failed");
                    }
                    if replies.send(Reply { id: request.id, outcome: outcome.into() }).is_err() {
                        tracing::debug!("facade gone, reply dropped");
                    }
                }
                .instrument(span),
            );
        }
        tracing::debug!("request stream ended");
    }

    /// Execute one operation.
    pub async fn handle(&self, op: Operation) -> OpResult {
        match op {
            Operation::GetMetadata { path } => self.get_metadata(&sandbox_path(&path)?).await,
            Operation::ReadEntries { path } => self.read_entries(&sandbox_path(&path)?).await,
            Operation::GetParent { path } => get_parent(&sandbox_path(&path)?),
            Operation::Remove { path } => self.remove(&sandbox_path(&path)?).await,
            Operation::RemoveRecursively { path } => {
                self.remove_recursively(&sandbox_path(&path)?).await
            }
            Operation::GetEntry { path, kind, flags } => {
                self.get_entry(&sandbox_path(&path)?, kind, flags).await
            }
            Operation::Copy {
                path,
                parent,
                new_name,
            } => {
                self.transfer(Transfer::Copy, &path, &parent, new_name.as_deref())
                    .await
            }
            Operation::Move {
                path,
                parent,
                new_name,
            } => {
                self.transfer(Transfer::Move, &path, &parent, new_name.as_deref())
                    .await
            }
        }
    }

    async fn get_metadata(&self, path: &str) -> OpResult {
        let attr = self.storage.stat(path).await?;
        Ok(Payload::Metadata(MetadataInfo {
            modification_time: attr.mtime,
            size: if attr.is_dir() { 0 } else { attr.size },
        }))
    }

    async fn read_entries(&self, dir: &str) -> OpResult {
        let attr = self.storage.stat(dir).await?;
        if !attr.is_dir() {
            return Err(ErrorInfo::type_mismatch(format!("{dir} is not a directory")));
        }
        let mut entries: Vec<EntryInfo> = self
            .storage
            .read_dir(dir)
            .await?
            .into_iter()
            .filter_map(|child| {
                let kind = child.kind.entry_kind()?;
                Some(EntryInfo::new(kind, path::join(dir, &child.name)))
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Payload::Entries(entries))
    }

    async fn remove(&self, target: &str) -> OpResult {
        if path::is_root(target) {
            return Err(ErrorInfo::no_modification_allowed("cannot remove the root"));
        }
        self.storage.remove(target).await?;
        Ok(Payload::Void)
    }

    async fn remove_recursively(&self, target: &str) -> OpResult {
        if path::is_root(target) {
            return Err(ErrorInfo::no_modification_allowed("cannot remove the root"));
        }
        self.storage.remove_all(target).await?;
        Ok(Payload::Void)
    }

    async fn get_entry(&self, target: &str, kind: EntryKind, flags: EntryFlags) -> OpResult {
        match self.storage.stat(target).await {
            Ok(_) if flags.create && flags.exclusive => {
                Err(ErrorInfo::path_exists(format!("{target} already exists")))
            }
            Ok(attr) if attr.kind.entry_kind() == Some(kind) => {
                Ok(Payload::Entry(EntryInfo::new(kind, target)))
            }
            Ok(_) => Err(ErrorInfo::type_mismatch(format!("{target} is not a {kind}"))),
            Err(StorageError::NotFound(_)) if flags.create => {
                match kind {
                    EntryKind::File => self.storage.create_file(target).await?,
                    EntryKind::Directory => self.storage.create_dir(target).await?,
                }
                tracing::debug!(path = target, %kind, "created");
                Ok(Payload::Entry(EntryInfo::new(kind, target)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn transfer(
        &self,
        how: Transfer,
        source: &str,
        parent: &str,
        new_name: Option<&str>,
    ) -> OpResult {
        let source = sandbox_path(source)?;
        let parent = sandbox_path(parent)?;
        if path::is_root(&source) {
            return Err(ErrorInfo::invalid_modification(format!(
                "cannot {how} the root"
            )));
        }

        let source_attr = self.storage.stat(&source).await?;
        let source_kind = match source_attr.kind {
            FileType::Other => {
                return Err(ErrorInfo::invalid_modification(format!(
                    "cannot {how} special file {source}"
                )));
            }
            kind => kind,
        };

        let name = match new_name {
            Some(name) if !name.is_empty() => name,
            _ => path::leaf_name(&source),
        };
        if !path::is_valid_name(name) {
            return Err(ErrorInfo::encoding(format!("invalid name {name:?}")));
        }

        let parent_attr = self.storage.stat(&parent).await?;
        if !parent_attr.is_dir() {
            return Err(ErrorInfo::invalid_modification(format!(
                "{parent} is not a directory"
            )));
        }

        let dest = path::join(&parent, name);
        if dest == source {
            return Err(ErrorInfo::invalid_modification(format!(
                "cannot {how} {source} onto itself"
            )));
        }

        let existing = match self.storage.stat(&dest).await {
            Ok(attr) => Some(attr.kind),
            Err(StorageError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        if let Some(dest_kind) = existing {
            if dest_kind == FileType::Other {
                return Err(ErrorInfo::invalid_modification(format!(
                    "cannot overwrite special file {dest}"
                )));
            }
            if dest_kind.is_dir() && !self.storage.is_empty_dir(&dest).await? {
                return Err(ErrorInfo::invalid_modification(format!(
                    "{dest} is a non-empty directory"
                )));
            }
            if dest_kind != source_kind {
                return Err(ErrorInfo::invalid_modification(format!(
                    "cannot replace {dest} with an entry of another kind"
                )));
            }
        }
        if path::is_parent_of(&source, &dest) {
            return Err(ErrorInfo::invalid_modification(format!(
                "cannot {how} {source} inside itself"
            )));
        }

        if existing.is_some() {
            self.storage.remove(&dest).await?;
        }
        match how {
            Transfer::Copy => self.storage.copy(&source, &dest).await?,
            Transfer::Move => self.storage.rename(&source, &dest).await?,
        }

        let kind = source_kind.entry_kind().ok_or_else(|| {
            ErrorInfo::unknown(format!("{dest} has no entry kind"))
        })?;
        Ok(Payload::Entry(EntryInfo::new(kind, dest)))
    }
}

#[derive(Debug, Clone, Copy)]
enum Transfer {
    Copy,
    Move,
}

impl std::fmt::Display for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transfer::Copy => f.write_str("copy"),
            Transfer::Move => f.write_str("move"),
        }
    }
}

/// Validate and canonicalize a path received from the facade.
fn sandbox_path(raw: &str) -> Result<String, ErrorInfo> {
    if !path::is_absolute(raw) || !path::is_valid_path(raw) {
        return Err(ErrorInfo::encoding(format!("invalid path {raw:?}")));
    }
    Ok(path::normalize(raw))
}

/// The parent of the root is the root.
fn get_parent(target: &str) -> OpResult {
    Ok(Payload::Entry(EntryInfo::directory(path::parent(target))))
}
