//! Request correlation keys.
//!
//! A [`RequestId`] binds an outbound request to its eventual reply. Ids are
//! allocated from a monotonically increasing counter per dispatcher, so two
//! outstanding requests can never share one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::constants::FIRST_REQUEST_ID;

/// Correlation key for one in-flight request.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw id. Only allocators and tests should need this.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out unique [`RequestId`]s. Safe to share across threads.
#[derive(Debug)]
pub struct RequestIdAllocator {
    next: AtomicU64,
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(FIRST_REQUEST_ID),
        }
    }

    /// Allocate the next id.
    pub fn next(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let ids = RequestIdAllocator::new();
        assert_eq!(ids.next().get(), 1);
        assert_eq!(ids.next().get(), 2);
        assert_eq!(ids.next(), RequestId::from_raw(3));
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let ids = Arc::new(RequestIdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_display() {
        assert_eq!(RequestId::from_raw(42).to_string(), "#42");
        assert_eq!(format!("{:?}", RequestId::from_raw(42)), "RequestId(42)");
    }
}
