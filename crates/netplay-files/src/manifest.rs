//! Folder manifest and its wire format.
//!
//! All multi-byte fields are big-endian.
//!
//! ```text
//! [entry_count: u32]
//! entry_count × [path_len: u16][path: UTF-8, '/'-separated][is_directory: u8]
//!               [original_len: u32][compressed_len: u32][compressed bytes]
//! ```
//!
//! Directory entries carry `original_len = 0` and `compressed_len = 0`. File
//! payloads stay compressed inside the manifest and are only inflated when
//! the entry is applied.

use crate::error::{Result, TransferError};
use crate::path::MAX_PATH_LEN;
use netplay_core::{Frame, FrameRef, WireReader};

/// Smallest possible encoded entry: empty path, flag, two length fields
const MIN_ENTRY_LEN: usize = 2 + 1 + 4 + 4;

/// What a manifest entry describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Directory marker (no payload)
    Directory,

    /// Regular file with its compressed contents
    File(Frame),
}

/// One entry of a folder manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path relative to the transfer root, `/`-separated
    pub path: String,

    /// Entry payload
    pub kind: EntryKind,
}

impl ManifestEntry {
    /// Directory marker
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
        }
    }

    /// File entry
    pub fn file(path: impl Into<String>, frame: Frame) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File(frame),
        }
    }

    /// True for directory markers
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Uncompressed size (0 for directories)
    pub fn size(&self) -> u64 {
        match &self.kind {
            EntryKind::Directory => 0,
            EntryKind::File(frame) => u64::from(frame.original_len()),
        }
    }

    /// Compressed file contents, if any
    pub fn frame(&self) -> Option<&Frame> {
        match &self.kind {
            EntryKind::Directory => None,
            EntryKind::File(frame) => Some(frame),
        }
    }

    fn encoded_len(&self) -> usize {
        let payload = self.frame().map_or(8, Frame::encoded_len);
        2 + self.path.len() + 1 + payload
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        // push() guarantees the path fits the u16 prefix
        buf.extend_from_slice(&(self.path.len() as u16).to_be_bytes());
        buf.extend_from_slice(self.path.as_bytes());
        match &self.kind {
            EntryKind::Directory => {
                buf.push(1);
                buf.extend_from_slice(&0u32.to_be_bytes());
                buf.extend_from_slice(&0u32.to_be_bytes());
            }
            EntryKind::File(frame) => {
                buf.push(0);
                frame.write_to(buf);
            }
        }
    }

    fn read(reader: &mut WireReader<'_>, max_original_len: usize) -> Result<Self> {
        let path_len = reader.read_u16()? as usize;
        let path_bytes = reader.read_bytes(path_len)?;
        let path = String::from_utf8(path_bytes.to_vec()).map_err(|_| {
            TransferError::InvalidManifest(format!(
                "entry path is not UTF-8: {}",
                String::from_utf8_lossy(path_bytes)
            ))
        })?;

        match reader.read_u8()? {
            0 => {
                let frame = FrameRef::read(reader, max_original_len)?;
                Ok(Self::file(path, frame.to_frame()))
            }
            1 => {
                let original_len = reader.read_u32()?;
                let compressed_len = reader.read_u32()?;
                if original_len != 0 || compressed_len != 0 {
                    return Err(TransferError::InvalidManifest(format!(
                        "directory entry {path} carries a payload"
                    )));
                }
                Ok(Self::directory(path))
            }
            flag => Err(TransferError::InvalidManifest(format!(
                "entry {path} has invalid directory flag {flag}"
            ))),
        }
    }
}

/// Ordered description of a directory tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderManifest {
    entries: Vec<ManifestEntry>,
}

impl FolderManifest {
    /// Empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    ///
    /// Fails if the path cannot be carried by the wire format.
    pub fn push(&mut self, entry: ManifestEntry) -> Result<()> {
        if entry.path.len() > MAX_PATH_LEN {
            return Err(TransferError::InvalidPath { path: entry.path });
        }
        if self.entries.len() >= u32::MAX as usize {
            return Err(TransferError::InvalidManifest(
                "too many entries".to_string(),
            ));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Entries in manifest order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Iterate entries in manifest order
    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of file entries
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_directory()).count()
    }

    /// Number of directory entries
    pub fn directory_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_directory()).count()
    }

    /// Sum of uncompressed file sizes
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(ManifestEntry::size).sum()
    }

    /// Size of the encoded manifest
    pub fn encoded_len(&self) -> usize {
        4 + self
            .entries
            .iter()
            .map(ManifestEntry::encoded_len)
            .sum::<usize>()
    }

    /// Append the wire encoding to `buf`
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len());
        buf.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            entry.write_to(buf);
        }
    }

    /// Serialize into a fresh buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut buf);
        buf
    }

    /// Parse an encoded manifest
    ///
    /// File payloads are validated against `max_original_len` but not
    /// inflated. Paths are not normalized here; that happens when the
    /// manifest is applied.
    pub fn from_bytes(data: &[u8], max_original_len: usize) -> Result<Self> {
        let mut reader = WireReader::new(data);
        let count = reader.read_u32()? as usize;

        // A hostile count cannot claim more entries than bytes allow
        reader.require(count.saturating_mul(MIN_ENTRY_LEN))?;

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(ManifestEntry::read(&mut reader, max_original_len)?);
        }

        if !reader.is_empty() {
            return Err(netplay_core::FrameError::TrailingBytes(reader.remaining()).into());
        }

        tracing::debug!(
            "Parsed manifest: {} entries, {} bytes",
            entries.len(),
            data.len()
        );
        Ok(Self { entries })
    }
}

impl<'a> IntoIterator for &'a FolderManifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
