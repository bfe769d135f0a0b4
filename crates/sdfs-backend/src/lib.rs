//! # sdfs-backend
//!
//! The privileged executor behind the sandboxed filesystem facade.
//!
//! - [`Service`] - consumes requests from a [`BackendLink`](sdfs_types::BackendLink)
//!   and answers each with exactly one reply
//! - [`StorageOps`] - the storage interface the service drives
//! - [`MemoryBackend`] - in-memory tree (tests, demos)
//! - [`LocalBackend`] - a host directory, with root-escape protection
//!
//! ## Error names
//!
//! Storage failures reach the facade as DOM-style names: missing paths are
//! `NotFoundError`, read-only storage and non-empty directories are
//! `NoModificationAllowedError`, symlinks out of the root are
//! `SecurityError`. See [`StorageError::error_name`].

pub mod backends;
mod error;
mod ops;
mod service;
mod types;

pub use backends::{LocalBackend, MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use ops::StorageOps;
pub use service::Service;
pub use types::{DirEntry, FileAttr, FileType};
