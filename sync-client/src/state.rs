//! Snapshot store: durable manifests and journals.
//!
//! Both files are JSON and are replaced atomically: the new contents go to a
//! sibling temp file which is synced and then renamed over the target, so a
//! reader never observes a half-written file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sync_types::{Manifest, UpdateJournal};

use crate::error::StateError;

/// Load a manifest. A missing file yields `Ok(None)`.
pub fn load_manifest(path: &Path) -> Result<Option<Manifest>, StateError> {
    match read_optional(path)? {
        Some(bytes) => Manifest::from_json(&bytes)
            .map(Some)
            .map_err(|source| StateError::Corrupt {
                path: path.to_path_buf(),
                source,
            }),
        None => Ok(None),
    }
}

/// Atomically replace the manifest at `path`.
pub fn save_manifest(path: &Path, manifest: &Manifest) -> Result<(), StateError> {
    let bytes = manifest.to_json().map_err(|source| StateError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &bytes)
}

/// Load a journal. A missing file yields an empty journal (first run).
pub fn load_journal(path: &Path) -> Result<UpdateJournal, StateError> {
    match read_optional(path)? {
        Some(bytes) => UpdateJournal::from_json(&bytes).map_err(|source| StateError::Corrupt {
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(UpdateJournal::default()),
    }
}

/// Atomically replace the journal at `path`.
pub fn save_journal(path: &Path, journal: &UpdateJournal) -> Result<(), StateError> {
    let bytes = journal.to_json().map_err(|source| StateError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &bytes)
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StateError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StateError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `contents` to a temp file next to `path`, fsync, then rename.
///
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StateError> {
    let io_err = |p: &Path| {
        let p = p.to_path_buf();
        move |source| StateError::Io { path: p, source }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let tmp = temp_path(path);
    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path)(source));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_manifest_is_none() {
        let dir = tempdir().unwrap();
        assert!(load_manifest(&dir.path().join("m.json")).unwrap().is_none());
    }

    #[test]
    fn missing_journal_is_empty() {
        let dir = tempdir().unwrap();
        let journal = load_journal(&dir.path().join("side-1/journal.json")).unwrap();
        assert!(journal.is_empty());
    }

    #[test]
    fn manifest_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state/m.json");
        let mut manifest = Manifest::new(12.5);
        manifest.dirs.insert(String::new());

        save_manifest(&path, &manifest).unwrap();
        assert_eq!(load_manifest(&path).unwrap(), Some(manifest));
    }

    #[test]
    fn journal_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.json");
        let mut journal = UpdateJournal::empty(3.0);
        journal.changes.added.insert("a.txt".into());

        save_journal(&path, &journal).unwrap();
        assert_eq!(load_journal(&path).unwrap(), journal);
    }

    #[test]
    fn malformed_json_is_corrupt_not_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.json");
        std::fs::write(&path, b"{\"added\": [").unwrap();

        assert!(matches!(
            load_journal(&path),
            Err(StateError::Corrupt { .. })
        ));
        assert!(matches!(
            load_manifest(&path),
            Err(StateError::Corrupt { .. })
        ));
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.json");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"two");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
