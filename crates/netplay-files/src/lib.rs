//! # Netplay Files
//!
//! File and folder transfer on top of the netplay frame codec.
//!
//! This crate provides:
//! - Single-file send/receive with atomic destination writes
//! - Folder manifests that preserve empty directories
//! - Path normalization that keeps received entries inside the destination
//! - An offload pool that moves compression off async tasks
//!
//! ## Example
//!
//! ```no_run
//! use netplay_files::{FolderCodec, FolderManifest};
//!
//! # fn main() -> netplay_files::Result<()> {
//! let codec = FolderCodec::default();
//! let bytes = codec.send_folder("saves/GALE01")?.to_bytes();
//!
//! // ... bytes travel to the other peer ...
//!
//! let report = codec.receive_folder_bytes(&bytes, "incoming/GALE01")?;
//! println!("{} files restored", report.files);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod error;
pub mod file;
pub mod folder;
pub mod manifest;
pub mod offload;
pub mod path;

pub use cancel::CancelFlag;
pub use error::{Result, TransferError};
pub use file::FileCodec;
pub use folder::{FolderCodec, FolderReport};
pub use manifest::{EntryKind, FolderManifest, ManifestEntry};
pub use offload::{OffloadConfig, TransferPool};
