//! Request and reply values exchanged with the privileged backend.
//!
//! One [`Request`] per operation, exactly one [`Reply`] per request. Both
//! carry the same [`RequestId`] so the reply can be routed back to whoever
//! issued the request.

use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumString};

use crate::error::ErrorInfo;
use crate::ids::RequestId;
use crate::path;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// Entry descriptor as produced by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub kind: EntryKind,
    /// Leaf name (empty for the root).
    pub name: String,
    /// Absolute sandbox path.
    pub full_path: String,
}

impl EntryInfo {
    /// Build a descriptor from a sandbox path; the name is its leaf segment.
    pub fn new(kind: EntryKind, full_path: impl Into<String>) -> Self {
        let full_path = full_path.into();
        let name = path::leaf_name(&full_path).to_string();
        Self {
            kind,
            name,
            full_path,
        }
    }

    /// Create a file descriptor.
    pub fn file(full_path: impl Into<String>) -> Self {
        Self::new(EntryKind::File, full_path)
    }

    /// Create a directory descriptor.
    pub fn directory(full_path: impl Into<String>) -> Self {
        Self::new(EntryKind::Directory, full_path)
    }

    /// The sandbox root.
    pub fn root() -> Self {
        Self::directory(path::ROOT)
    }
}

/// Stat result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataInfo {
    #[serde(
        serialize_with = "serialize_epoch_nanos",
        deserialize_with = "deserialize_epoch_nanos"
    )]
    pub modification_time: SystemTime,
    /// Size in bytes; always 0 for directories.
    pub size: u64,
}

// serde's own SystemTime encoding refuses times before the epoch, and host
// files can carry those. Signed nanoseconds cover every SystemTime the
// platforms produce.
fn serialize_epoch_nanos<S: Serializer>(time: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
    let nanos = match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(after) => i128::try_from(after.as_nanos()).unwrap_or(i128::MAX),
        Err(e) => i128::try_from(e.duration().as_nanos()).map_or(i128::MIN, |n| -n),
    };
    nanos.serialize(s)
}

fn deserialize_epoch_nanos<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let nanos = i128::deserialize(d)?;
    let magnitude = nanos.unsigned_abs();
    let offset = std::time::Duration::new(
        u64::try_from(magnitude / NANOS_PER_SEC).unwrap_or(u64::MAX),
        (magnitude % NANOS_PER_SEC) as u32,
    );
    let time = if nanos >= 0 {
        SystemTime::UNIX_EPOCH.checked_add(offset)
    } else {
        SystemTime::UNIX_EPOCH.checked_sub(offset)
    };
    time.ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
}

/// Options for looking up an entry by path.
///
/// `create` makes a missing entry; with `exclusive` as well, an existing one
/// is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryFlags {
    pub create: bool,
    pub exclusive: bool,
}

impl EntryFlags {
    /// Look up only.
    pub const OPEN: Self = Self {
        create: false,
        exclusive: false,
    };

    /// Look up, creating the entry if it is missing.
    pub const CREATE: Self = Self {
        create: true,
        exclusive: false,
    };

    /// Create the entry; fail if it already exists.
    pub const CREATE_NEW: Self = Self {
        create: true,
        exclusive: true,
    };
}

/// Operation tag, without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum OperationKind {
    GetMetadata,
    Copy,
    Move,
    Remove,
    GetParent,
    ReadEntries,
    GetEntry,
    RemoveRecursively,
}

impl OperationKind {
    /// Whether `payload` is the shape this operation succeeds with.
    pub fn accepts(&self, payload: &Payload) -> bool {
        matches!(
            (self, payload),
            (OperationKind::GetMetadata, Payload::Metadata(_))
                | (OperationKind::Copy, Payload::Entry(_))
                | (OperationKind::Move, Payload::Entry(_))
                | (OperationKind::GetParent, Payload::Entry(_))
                | (OperationKind::ReadEntries, Payload::Entries(_))
                | (OperationKind::Remove, Payload::Void)
                | (OperationKind::GetEntry, Payload::Entry(_))
                | (OperationKind::RemoveRecursively, Payload::Void)
        )
    }
}

/// One filesystem operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    GetMetadata {
        path: String,
    },
    Copy {
        path: String,
        /// Full path of the destination directory.
        parent: String,
        /// New leaf name; `None` keeps the source's name.
        new_name: Option<String>,
    },
    Move {
        path: String,
        parent: String,
        new_name: Option<String>,
    },
    Remove {
        path: String,
    },
    GetParent {
        path: String,
    },
    ReadEntries {
        path: String,
    },
    /// Look up (and possibly create) the entry at `path`, which must be of
    /// `kind`.
    GetEntry {
        path: String,
        kind: EntryKind,
        flags: EntryFlags,
    },
    /// Remove `path` and everything below it.
    RemoveRecursively {
        path: String,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::GetMetadata { .. } => OperationKind::GetMetadata,
            Operation::Copy { .. } => OperationKind::Copy,
            Operation::Move { .. } => OperationKind::Move,
            Operation::Remove { .. } => OperationKind::Remove,
            Operation::GetParent { .. } => OperationKind::GetParent,
            Operation::ReadEntries { .. } => OperationKind::ReadEntries,
            Operation::GetEntry { .. } => OperationKind::GetEntry,
            Operation::RemoveRecursively { .. } => OperationKind::RemoveRecursively,
        }
    }

    /// The target path every operation carries.
    pub fn path(&self) -> &str {
        match self {
            Operation::GetMetadata { path }
            | Operation::Copy { path, .. }
            | Operation::Move { path, .. }
            | Operation::Remove { path }
            | Operation::GetParent { path }
            | Operation::ReadEntries { path }
            | Operation::GetEntry { path, .. }
            | Operation::RemoveRecursively { path } => path,
        }
    }
}

/// Outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub op: Operation,
}

/// Operation-specific success payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Metadata(MetadataInfo),
    Entry(EntryInfo),
    /// Directory listing, in backend enumeration order.
    Entries(Vec<EntryInfo>),
    Void,
}

/// Tagged result of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success(Payload),
    Error(ErrorInfo),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn into_result(self) -> Result<Payload, ErrorInfo> {
        match self {
            Outcome::Success(payload) => Ok(payload),
            Outcome::Error(err) => Err(err),
        }
    }
}

impl From<Result<Payload, ErrorInfo>> for Outcome {
    fn from(result: Result<Payload, ErrorInfo>) -> Self {
        match result {
            Ok(payload) => Outcome::Success(payload),
            Err(err) => Outcome::Error(err),
        }
    }
}

/// Inbound reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: RequestId,
    pub outcome: Outcome,
}

impl Reply {
    pub fn success(id: RequestId, payload: Payload) -> Self {
        Self {
            id,
            outcome: Outcome::Success(payload),
        }
    }

    pub fn error(id: RequestId, err: ErrorInfo) -> Self {
        Self {
            id,
            outcome: Outcome::Error(err),
        }
    }
}
