//! Wire-level constants.

/// Largest postcard frame accepted on a byte-stream transport (16 MiB).
///
/// A directory listing is the biggest payload the protocol carries; anything
/// past this is treated as a corrupt stream rather than a real reply.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// First id handed out by a fresh [`RequestIdAllocator`](crate::RequestIdAllocator).
pub const FIRST_REQUEST_ID: u64 = 1;
