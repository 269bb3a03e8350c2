//! Relative path handling for folder manifests.
//!
//! Manifest paths always use `/` as the separator regardless of the sending
//! platform. Before anything is written, a received path is normalized and
//! rejected if it could land outside the destination root:
//!
//! - a leading `/` (absolute path)
//! - a `..` that climbs above the root
//! - a component containing NUL
//! - on Windows only, a component containing `\` or `:` (separators, drive
//!   letters, alternate data streams); elsewhere these are ordinary name
//!   characters
//!
//! `.` and empty components are dropped; `..` that stays inside the root is
//! resolved (`a/../b` becomes `b`). The sender applies the same component
//! rule, so any tree it can describe is one this platform can receive.

use crate::error::{Result, TransferError};
use std::path::{Component, Path, PathBuf};

/// Largest path length the manifest's u16 length prefix can carry
pub const MAX_PATH_LEN: usize = u16::MAX as usize;

/// True if `name` cannot be used as a single path component on this platform
pub fn is_forbidden_component(name: &str) -> bool {
    if cfg!(windows) {
        name.contains(['\\', ':', '\0'])
    } else {
        name.contains('\0')
    }
}

/// Normalize a manifest path, rejecting anything that escapes the root
///
/// Returns the canonical `/`-joined form; the empty string means the root
/// itself.
pub fn normalize_relative(raw: &str) -> Result<String> {
    let escape = || TransferError::PathEscape {
        path: raw.to_string(),
    };

    if raw.starts_with('/') {
        return Err(escape());
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop().ok_or_else(escape)?;
            }
            name if is_forbidden_component(name) => return Err(escape()),
            name => parts.push(name),
        }
    }

    Ok(parts.join("/"))
}

/// Join a normalized relative path onto `root`
pub fn resolve(root: &Path, normalized: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in normalized.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}

/// Render a path relative to the transfer root in manifest form
///
/// Fails for non-UTF-8 names, names the receiving side would reject as
/// components, and paths that do not fit the manifest's length field.
pub fn to_wire_path(relative: &Path) -> Result<String> {
    let invalid = || TransferError::InvalidPath {
        path: relative.to_string_lossy().into_owned(),
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(invalid)?;
                if is_forbidden_component(name) {
                    return Err(invalid());
                }
                parts.push(name);
            }
            Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }

    let wire = parts.join("/");
    if wire.is_empty() || wire.len() > MAX_PATH_LEN {
        return Err(invalid());
    }
    Ok(wire)
}
