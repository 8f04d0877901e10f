//! Relative path keys.
//!
//! Manifests and journals key files by `/`-separated paths relative to the
//! synced root. Journals arrive from the peer, so every key is checked before
//! it is joined onto a local directory.

use std::path::{Component, Path, PathBuf};

use crate::error::SyncError;

/// Join a `/`-separated relative key onto `root`.
///
/// Rejects empty keys, absolute keys and any `.` or `..` segment, so the
/// result always stays below `root`.
pub fn join_relative(root: &Path, rel: &str) -> Result<PathBuf, SyncError> {
    if rel.is_empty() || rel.starts_with('/') || rel.contains('\\') {
        return Err(SyncError::InvalidPath(rel.to_string()));
    }

    let mut path = root.to_path_buf();
    for segment in rel.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(SyncError::InvalidPath(rel.to_string()));
        }
        path.push(segment);
    }
    Ok(path)
}

/// Turn a path below `root` into its `/`-separated key.
///
/// Returns `Some("")` for the root itself and `None` when `path` is not
/// below `root` or has a non-UTF-8 component.
pub fn to_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            _ => return None,
        }
    }
    Some(segments.join("/"))
}
