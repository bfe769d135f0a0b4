//! Stat results.

use std::time::SystemTime;

use sdfs_types::MetadataInfo;

/// Result of a `get_metadata` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    modification_time: SystemTime,
    size: u64,
}

impl Metadata {
    pub fn modification_time(&self) -> SystemTime {
        self.modification_time
    }

    /// Size in bytes. Directories report 0.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl From<MetadataInfo> for Metadata {
    fn from(info: MetadataInfo) -> Self {
        Self {
            modification_time: info.modification_time,
            size: info.size,
        }
    }
}
