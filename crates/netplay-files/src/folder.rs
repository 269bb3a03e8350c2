//! Folder transfer codec.
//!
//! The sender walks the tree in a fixed order (lexicographic by file name,
//! each directory before its children) so identical trees always produce
//! identical manifests. Every directory is recorded, which is what lets empty
//! directories survive the round trip. Symbolic links and special files are
//! skipped with a warning.
//!
//! The receiver normalizes every path before touching the disk. A single
//! escaping path rejects the whole manifest and nothing is created. Entries
//! are then applied in manifest order; when two entries name the same file,
//! the later one wins. An entry whose path runs through a symbolic link that
//! already exists under the destination is refused as an escape.

use crate::cancel::CancelFlag;
use crate::error::{Result, TransferError};
use crate::file::FileCodec;
use crate::manifest::{EntryKind, FolderManifest, ManifestEntry};
use crate::path::{normalize_relative, resolve, to_wire_path};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Summary of an applied manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderReport {
    /// Files written
    pub files: usize,

    /// Directory entries applied
    pub directories: usize,

    /// Uncompressed bytes written
    pub bytes: u64,
}

/// Serializes directory trees into manifests and restores them
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderCodec {
    files: FileCodec,
}

impl FolderCodec {
    /// Create a folder codec on top of a file codec
    pub fn new(files: FileCodec) -> Self {
        Self { files }
    }

    /// Underlying file codec
    pub fn files(&self) -> &FileCodec {
        &self.files
    }

    /// Build a manifest for everything under `root`
    pub fn send_folder(&self, root: impl AsRef<Path>) -> Result<FolderManifest> {
        self.send_folder_with_cancel(root, &CancelFlag::new())
    }

    /// [`send_folder`](Self::send_folder), stopping at the next entry once
    /// `cancel` is set
    pub fn send_folder_with_cancel(
        &self,
        root: impl AsRef<Path>,
        cancel: &CancelFlag,
    ) -> Result<FolderManifest> {
        let root = root.as_ref();
        let metadata = fs::metadata(root).map_err(|e| TransferError::from_read(root, e))?;
        if !metadata.is_dir() {
            return Err(TransferError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let mut manifest = FolderManifest::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled {
                    completed: manifest.len(),
                });
            }

            let entry = entry.map_err(|e| walk_error(root, e))?;
            let file_type = entry.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                warn!(
                    "Skipping {}: not a regular file or directory",
                    entry.path().display()
                );
                continue;
            }

            let relative =
                entry
                    .path()
                    .strip_prefix(root)
                    .map_err(|_| TransferError::InvalidPath {
                        path: entry.path().to_string_lossy().into_owned(),
                    })?;
            let wire_path = to_wire_path(relative)?;

            if file_type.is_dir() {
                debug!("Manifest dir {}", wire_path);
                manifest.push(ManifestEntry::directory(wire_path))?;
            } else {
                let frame = self.files.send_file(entry.path())?;
                debug!("Manifest file {} ({} bytes)", wire_path, frame.original_len());
                manifest.push(ManifestEntry::file(wire_path, frame))?;
            }
        }

        info!(
            "Built manifest for {}: {} files, {} directories, {} bytes",
            root.display(),
            manifest.file_count(),
            manifest.directory_count(),
            manifest.total_size()
        );
        Ok(manifest)
    }

    /// Recreate the tree described by `manifest` under `destination`
    pub fn receive_folder(
        &self,
        manifest: &FolderManifest,
        destination: impl AsRef<Path>,
    ) -> Result<FolderReport> {
        self.receive_folder_with_cancel(manifest, destination, &CancelFlag::new())
    }

    /// [`receive_folder`](Self::receive_folder), stopping at the next entry
    /// once `cancel` is set
    ///
    /// Entries applied before the stop stay on disk.
    pub fn receive_folder_with_cancel(
        &self,
        manifest: &FolderManifest,
        destination: impl AsRef<Path>,
        cancel: &CancelFlag,
    ) -> Result<FolderReport> {
        let destination = destination.as_ref();

        // Validate everything before the first write
        let targets = manifest
            .iter()
            .map(|entry| {
                let normalized = normalize_relative(&entry.path)?;
                if normalized.is_empty() && !entry.is_directory() {
                    return Err(TransferError::InvalidPath {
                        path: entry.path.clone(),
                    });
                }
                Ok(normalized)
            })
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| warn!("Rejected manifest for {}: {}", destination.display(), e))?;

        fs::create_dir_all(destination).map_err(|e| TransferError::from_write(destination, e))?;

        let mut report = FolderReport::default();
        for (index, (entry, normalized)) in manifest.iter().zip(&targets).enumerate() {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled { completed: index });
            }

            let target = resolve(destination, normalized);
            reject_symlinks(destination, normalized, &entry.path)
                .and_then(|()| self.apply(entry, &target, &mut report))
                .map_err(|source| TransferError::Entry {
                    index,
                    path: entry.path.clone(),
                    source: Box::new(source),
                })?;
        }

        info!(
            "Restored {} files, {} directories ({} bytes) into {}",
            report.files,
            report.directories,
            report.bytes,
            destination.display()
        );
        Ok(report)
    }

    /// Parse an encoded manifest and apply it under `destination`
    pub fn receive_folder_bytes(
        &self,
        manifest_bytes: &[u8],
        destination: impl AsRef<Path>,
    ) -> Result<FolderReport> {
        let manifest =
            FolderManifest::from_bytes(manifest_bytes, self.files.codec().max_original_len())?;
        self.receive_folder(&manifest, destination)
    }

    fn apply(&self, entry: &ManifestEntry, target: &Path, report: &mut FolderReport) -> Result<()> {
        match &entry.kind {
            EntryKind::Directory => {
                fs::create_dir_all(target).map_err(|e| TransferError::from_write(target, e))?;
                report.directories += 1;
            }
            EntryKind::File(frame) => {
                report.bytes += self.files.receive_frame(frame, target)?;
                report.files += 1;
            }
        }
        Ok(())
    }
}

/// Refuse a path that passes through an existing symbolic link below `root`
fn reject_symlinks(root: &Path, normalized: &str, raw: &str) -> Result<()> {
    let mut current = root.to_path_buf();
    for part in normalized.split('/').filter(|p| !p.is_empty()) {
        current.push(part);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                warn!("Refusing {}: {} is a symbolic link", raw, current.display());
                return Err(TransferError::PathEscape {
                    path: raw.to_string(),
                });
            }
            Ok(_) => {}
            // Nothing below a missing component exists yet
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(TransferError::from_read(&current, e)),
        }
    }
    Ok(())
}

fn walk_error(root: &Path, err: walkdir::Error) -> TransferError {
    let path = err.path().unwrap_or(root).to_path_buf();
    match err.into_io_error() {
        Some(source) => TransferError::from_read(&path, source),
        None => TransferError::ReadError {
            path,
            source: io::Error::other("filesystem loop"),
        },
    }
}
