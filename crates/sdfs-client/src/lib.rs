//! # sdfs-client
//!
//! The caller-facing side of the sandboxed filesystem. Callers hold
//! lightweight [`FileEntry`] / [`DirectoryEntry`] / [`DirectoryReader`]
//! handles; every operation is a request sent to the privileged backend
//! through a shared [`Dispatcher`], answered later by exactly one callback
//! (or one resolved future).
//!
//! ```no_run
//! # async fn demo(link: sdfs_types::ClientLink) {
//! use sdfs_client::FileSystem;
//!
//! let fs = FileSystem::connect(link, "SD Card");
//! let listing = fs.root().entries().await.unwrap();
//! for entry in &listing {
//!     println!("{}", entry.full_path());
//! }
//! # }
//! ```

pub mod constants;
mod dispatch;
mod entry;
mod entry_array;
mod error;
mod filesystem;
mod metadata;
mod reader;

pub use dispatch::{Completion, DispatchStats, Dispatcher, ErrorCallback, SuccessCallback};
pub use entry::{DirectoryEntry, Entry, FileEntry};
pub use entry_array::EntryArray;
pub use error::{DomError, FsResult};
pub use filesystem::FileSystem;
pub use metadata::Metadata;
pub use reader::DirectoryReader;
pub use sdfs_types::EntryFlags;
