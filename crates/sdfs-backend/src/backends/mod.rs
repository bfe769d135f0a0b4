//! Storage backends.
//!
//! Backends implement [`StorageOps`](crate::StorageOps) for different storage types.

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
