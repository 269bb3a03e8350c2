//! Single-file transfer codec.
//!
//! Sending reads the whole file and compresses it into one frame. Receiving
//! decodes the frame first and only then writes, through a temporary file in
//! the destination directory that is renamed into place, so a failed decode
//! or a full disk never leaves a half-written destination.

use crate::error::{Result, TransferError};
use netplay_core::{Frame, FrameCodec};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Compresses files into frames and restores them to disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCodec {
    codec: FrameCodec,
}

impl FileCodec {
    /// Create a file codec on top of a packet codec
    pub fn new(codec: FrameCodec) -> Self {
        Self { codec }
    }

    /// Underlying packet codec
    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    /// Read `path` and compress its contents into a frame
    ///
    /// # Errors
    ///
    /// `NotFound` / `PermissionDenied` from the filesystem, `ReadError` for
    /// other read failures or non-regular files, `SizeLimitExceeded` if the
    /// file is larger than the configured frame ceiling.
    pub fn send_file(&self, path: impl AsRef<Path>) -> Result<Frame> {
        let path = path.as_ref();
        let limit = self.codec.max_original_len() as u64;

        let metadata = fs::metadata(path).map_err(|e| TransferError::from_read(path, e))?;
        if !metadata.is_file() {
            return Err(TransferError::ReadError {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }
        if metadata.len() > limit {
            return Err(TransferError::SizeLimitExceeded {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let data = fs::read(path).map_err(|e| TransferError::from_read(path, e))?;
        // The file may have grown between stat and read
        if data.len() as u64 > limit {
            return Err(TransferError::SizeLimitExceeded {
                path: path.to_path_buf(),
                size: data.len() as u64,
                limit,
            });
        }

        let frame = self.codec.encode(&data);
        tracing::debug!(
            "Compressed {}: {} -> {} bytes",
            path.display(),
            data.len(),
            frame.compressed_len()
        );
        Ok(frame)
    }

    /// Decode an encoded frame and write it to `destination`
    ///
    /// Missing parent directories are created. Nothing is written if the
    /// frame fails to decode.
    pub fn receive_file(&self, frame_bytes: &[u8], destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        let data = self
            .codec
            .decode(frame_bytes)
            .map_err(|source| TransferError::Decode {
                path: destination.to_path_buf(),
                source,
            })?;
        write_atomic(destination, &data)
    }

    /// Like [`receive_file`](Self::receive_file) for an already parsed frame
    pub fn receive_frame(&self, frame: &Frame, destination: impl AsRef<Path>) -> Result<u64> {
        let destination = destination.as_ref();
        let data = self
            .codec
            .decode_frame(frame)
            .map_err(|source| TransferError::Decode {
                path: destination.to_path_buf(),
                source,
            })?;
        write_atomic(destination, &data)?;
        Ok(data.len() as u64)
    }
}

/// Write `data` to `destination` via a temporary sibling and a rename
fn write_atomic(destination: &Path, data: &[u8]) -> Result<()> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| TransferError::from_write(parent, e))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".netplay-")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| TransferError::from_write(destination, e))?;

    staged
        .write_all(data)
        .and_then(|()| staged.as_file().sync_data())
        .map_err(|e| TransferError::from_write(destination, e))?;

    staged
        .persist(destination)
        .map_err(|e| TransferError::from_write(destination, e.error))?;

    tracing::debug!("Wrote {} bytes to {}", data.len(), destination.display());
    Ok(())
}
