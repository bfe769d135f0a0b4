//! # sdfs-types
//!
//! Shared vocabulary for the sandboxed filesystem: everything that crosses
//! the boundary between the unprivileged facade and the privileged backend.
//!
//! - [`Request`] / [`Reply`] - one request per operation, exactly one reply
//!   per request, correlated by [`RequestId`]
//! - [`ErrorName`] / [`ErrorInfo`] - DOM-style error descriptors
//! - [`path`] - sandbox path rules (absolute, `/`-separated, `/` is the root)
//! - [`link`] - in-process duplex channel between the two sides
//! - [`frame`] - length-prefixed postcard frames for byte-stream transports

pub mod constants;
mod error;
pub mod frame;
mod ids;
pub mod link;
pub mod path;
mod wire;

pub use error::{ErrorInfo, ErrorName};
pub use frame::FrameError;
pub use ids::{RequestId, RequestIdAllocator};
pub use link::{BackendLink, ClientLink, LinkClosed};
pub use wire::{
    EntryFlags, EntryInfo, EntryKind, MetadataInfo, Operation, OperationKind, Outcome, Payload, Reply,
    Request,
};
