//! Offloading of CPU-bound transfer work.
//!
//! Compression, decompression and the filesystem work around them run on
//! tokio's blocking pool so the tasks reading from the network are never
//! stalled. A semaphore bounds how many jobs run at once; callers beyond the
//! bound wait for a permit.

use crate::cancel::CancelFlag;
use crate::error::{Result, TransferError};
use crate::file::FileCodec;
use crate::folder::{FolderCodec, FolderReport};
use crate::manifest::FolderManifest;
use netplay_core::{CodecConfig, Frame, FrameCodec};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Offload pool configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffloadConfig {
    /// Jobs allowed to run at the same time
    pub max_concurrent: usize,

    /// Codec settings used by every job
    pub codec: CodecConfig,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: std::thread::available_parallelism().map_or(4, NonZeroUsize::get),
            codec: CodecConfig::default(),
        }
    }
}

/// Runs transfer jobs on blocking workers, bounded by a permit count
#[derive(Debug, Clone)]
pub struct TransferPool {
    permits: Arc<Semaphore>,
    folders: FolderCodec,
}

impl TransferPool {
    /// Create a pool; a `max_concurrent` of zero is treated as one
    ///
    /// Fails with [`TransferError::Config`] if the codec settings are invalid.
    pub fn new(config: OffloadConfig) -> Result<Self> {
        let files = FileCodec::new(FrameCodec::new(config.codec)?);
        Ok(Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            folders: FolderCodec::new(files),
        })
    }

    /// Permits not currently held by a running job
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop accepting jobs; running jobs finish, waiting ones fail
    pub fn shutdown(&self) {
        self.permits.close();
    }

    /// True once [`shutdown`](Self::shutdown) has been called on any clone
    pub fn is_shutdown(&self) -> bool {
        self.permits.is_closed()
    }

    /// Compress an in-memory buffer
    pub async fn encode(&self, data: Vec<u8>) -> Result<Frame> {
        let limit = self.folders.files().codec().max_original_len();
        if data.len() > limit {
            return Err(TransferError::BufferTooLarge {
                size: data.len() as u64,
                limit: limit as u64,
            });
        }
        let size = data.len();
        let result = self
            .run(move |codec| Ok(codec.files().codec().encode(&data)))
            .await;
        log_outcome("encode", &format_args!("{size} byte buffer"), &result);
        result
    }

    /// Decompress an encoded frame
    pub async fn decode(&self, frame_bytes: Vec<u8>) -> Result<Vec<u8>> {
        let size = frame_bytes.len();
        let result = self
            .run(move |codec| Ok(codec.files().codec().decode(&frame_bytes)?))
            .await;
        log_outcome("decode", &format_args!("{size} byte frame"), &result);
        result
    }

    /// Offloaded [`FileCodec::send_file`]
    pub async fn send_file(&self, path: impl Into<PathBuf>) -> Result<Frame> {
        let path = path.into();
        let job_path = path.clone();
        let result = self
            .run(move |codec| codec.files().send_file(&job_path))
            .await;
        log_outcome("send_file", &path.display(), &result);
        result
    }

    /// Offloaded [`FileCodec::receive_file`]
    pub async fn receive_file(
        &self,
        frame_bytes: Vec<u8>,
        destination: impl Into<PathBuf>,
    ) -> Result<()> {
        let destination = destination.into();
        let job_path = destination.clone();
        let result = self
            .run(move |codec| codec.files().receive_file(&frame_bytes, &job_path))
            .await;
        log_outcome("receive_file", &destination.display(), &result);
        result
    }

    /// Offloaded [`FolderCodec::send_folder_with_cancel`]
    pub async fn send_folder(
        &self,
        root: impl Into<PathBuf>,
        cancel: CancelFlag,
    ) -> Result<FolderManifest> {
        let root = root.into();
        let job_root = root.clone();
        let result = self
            .run(move |codec| codec.send_folder_with_cancel(&job_root, &cancel))
            .await;
        log_outcome("send_folder", &root.display(), &result);
        result
    }

    /// Offloaded [`FolderCodec::receive_folder_with_cancel`]
    pub async fn receive_folder(
        &self,
        manifest: FolderManifest,
        destination: impl Into<PathBuf>,
        cancel: CancelFlag,
    ) -> Result<FolderReport> {
        let destination = destination.into();
        let job_path = destination.clone();
        let result = self
            .run(move |codec| codec.receive_folder_with_cancel(&manifest, &job_path, &cancel))
            .await;
        log_outcome("receive_folder", &destination.display(), &result);
        result
    }

    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(FolderCodec) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| TransferError::Worker("transfer pool is shut down".to_string()))?;
        let codec = self.folders;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job(codec)
        })
        .await
        .map_err(|e| TransferError::Worker(e.to_string()))?
    }
}

fn log_outcome<T>(operation: &str, target: &dyn Display, result: &Result<T>) {
    match result {
        Ok(_) => tracing::info!("Transfer complete: {} {}", operation, target),
        Err(e) => tracing::warn!("Transfer failed: {} {}: {}", operation, target, e),
    }
}
