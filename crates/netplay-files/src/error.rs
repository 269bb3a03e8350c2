//! Error types for file and folder transfers
//!
//! Every variant names the path it concerns so a failed transfer can be
//! reported to the user as "which path, and why".

use netplay_core::{ConfigError, FrameError};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias for transfer operations
pub type Result<T> = std::result::Result<T, TransferError>;

/// Errors that can occur while sending or receiving files and folders
#[derive(Debug, Error)]
pub enum TransferError {
    // ============ Filesystem Errors ============
    /// Source path does not exist
    #[error("not found: {}", .path.display())]
    NotFound {
        /// Offending path
        path: PathBuf,
    },

    /// Source path could not be opened for reading
    #[error("permission denied: {}", .path.display())]
    PermissionDenied {
        /// Offending path
        path: PathBuf,
    },

    /// Any other read failure
    #[error("failed to read {}: {source}", .path.display())]
    ReadError {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Destination could not be written (disk full, permissions, ...)
    #[error("failed to write {}: {source}", .path.display())]
    WriteError {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Folder transfer root is not a directory
    #[error("not a directory: {}", .path.display())]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },

    // ============ Payload Errors ============
    /// Frame destined for a file failed to decode
    #[error("failed to decode payload for {}: {source}", .path.display())]
    Decode {
        /// Destination the payload was meant for
        path: PathBuf,
        /// Underlying frame error
        source: FrameError,
    },

    /// In-memory frame failed to decode
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// File is larger than the configured frame ceiling
    #[error("{} is {size} bytes, over the {limit} byte limit", .path.display())]
    SizeLimitExceeded {
        /// Offending path
        path: PathBuf,
        /// Size on disk
        size: u64,
        /// Configured ceiling
        limit: u64,
    },

    /// In-memory buffer is larger than the configured frame ceiling
    #[error("buffer of {size} bytes exceeds the {limit} byte limit")]
    BufferTooLarge {
        /// Buffer length
        size: u64,
        /// Configured ceiling
        limit: u64,
    },

    // ============ Manifest Errors ============
    /// Manifest path resolves outside the destination root
    #[error("path escapes destination root: {path}")]
    PathEscape {
        /// Path as written in the manifest
        path: String,
    },

    /// Manifest path cannot name a file (empty, too long, not UTF-8)
    #[error("invalid path: {path}")]
    InvalidPath {
        /// Path as written in the manifest (lossy for non-UTF-8 sources)
        path: String,
    },

    /// Manifest bytes are structurally invalid
    #[error("malformed manifest: {0}")]
    InvalidManifest(String),

    /// A single manifest entry failed; remaining entries were not applied
    #[error("entry {index} ({path}) failed: {source}")]
    Entry {
        /// Position in the manifest
        index: usize,
        /// Entry path as written in the manifest
        path: String,
        /// Cause
        source: Box<TransferError>,
    },

    // ============ Operational Errors ============
    /// Codec or pool configuration rejected
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Transfer stopped at an entry boundary on request
    #[error("transfer cancelled after {completed} entries")]
    Cancelled {
        /// Entries fully processed before the stop
        completed: usize,
    },

    /// Offloaded worker task panicked or was dropped
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl TransferError {
    /// Map a read-side I/O error, keeping the not-found / permission cases distinct
    pub fn from_read(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::ReadError { path, source },
        }
    }

    /// Map a write-side I/O error
    pub fn from_write(path: &Path, source: io::Error) -> Self {
        Self::WriteError {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for rejections made on security grounds
    #[must_use]
    pub fn is_security_violation(&self) -> bool {
        matches!(self.root_cause(), Self::PathEscape { .. })
    }

    /// Innermost error, looking through per-entry wrapping
    #[must_use]
    pub fn root_cause(&self) -> &TransferError {
        match self {
            Self::Entry { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_mapping() {
        let path = Path::new("/tmp/missing");

        let err = TransferError::from_read(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, TransferError::NotFound { .. }));

        let err = TransferError::from_read(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, TransferError::PermissionDenied { .. }));

        let err = TransferError::from_read(path, io::Error::from(io::ErrorKind::Interrupted));
        assert!(matches!(err, TransferError::ReadError { .. }));
    }

    #[test]
    fn test_entry_error_names_path() {
        let err = TransferError::Entry {
            index: 3,
            path: "sub/b.txt".to_string(),
            source: Box::new(TransferError::from_write(
                Path::new("/dst/sub/b.txt"),
                io::Error::from(io::ErrorKind::PermissionDenied),
            )),
        };

        let message = err.to_string();
        assert!(message.contains("entry 3"));
        assert!(message.contains("sub/b.txt"));
        assert!(matches!(err.root_cause(), TransferError::WriteError { .. }));
        assert!(!err.is_security_violation());
    }

    #[test]
    fn test_path_escape_is_security_violation() {
        let err = TransferError::PathEscape {
            path: "../../etc/passwd".to_string(),
        };
        assert!(err.is_security_violation());
    }
}
