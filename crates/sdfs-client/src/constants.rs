//! Facade defaults.

/// Display name used by [`FileSystem::with_defaults`](crate::FileSystem::with_defaults).
pub const DEFAULT_FS_NAME: &str = "SD Card";

/// Message delivered when a request cannot be handed to the backend.
pub const BACKEND_UNAVAILABLE: &str = "backend unavailable";

/// Message delivered to requests still outstanding when the reply stream ends.
pub const BACKEND_DISCONNECTED: &str = "backend disconnected";
