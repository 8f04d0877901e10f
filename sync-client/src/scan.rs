//! Snapshot scanner.
//!
//! Walks a tree and produces a [`Manifest`]: every regular file with its
//! size, timestamps and SHA-256 content hash, plus every directory visited.
//! Hashes are taken from the previous manifest whenever a file's
//! `(mtime, ctime, size)` triple is unchanged.

use std::fs::{self, Metadata};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use sync_types::{to_relative, unix_now, ContentHash, FileRecord, Manifest};
use walkdir::WalkDir;

use crate::error::ScanError;

/// Read buffer size for hashing.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Counters and warnings from one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files whose content was read and hashed.
    pub hashed: usize,
    /// Files whose hash was reused from the previous manifest.
    pub reused: usize,
    /// Entries skipped because they vanished or could not be read.
    pub skipped: Vec<String>,
}

/// Scanner for one directory tree.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    /// Create a scanner for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory being scanned.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the tree, reusing hashes from `previous` where the stat triple
    /// is unchanged.
    ///
    /// # Errors
    /// Only a missing or unreadable root fails the scan. Files that disappear
    /// mid-walk are skipped and listed in the report.
    pub fn scan(&self, previous: Option<&Manifest>) -> Result<(Manifest, ScanReport), ScanError> {
        let meta = fs::metadata(&self.root).map_err(|source| ScanError::Root {
            path: self.root.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory {
                path: self.root.clone(),
            });
        }

        let mut manifest = Manifest::empty();
        let mut report = ScanReport::default();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    // The root itself failing is fatal; anything below is a race.
                    if e.depth() == 0 {
                        let source = e
                            .into_io_error()
                            .unwrap_or_else(|| io::Error::other("walk failed"));
                        return Err(ScanError::Root {
                            path: self.root.clone(),
                            source,
                        });
                    }
                    let shown = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    tracing::warn!(path = %shown, error = %e, "skipping unreadable entry");
                    report.skipped.push(shown);
                    continue;
                }
            };

            let Some(rel) = to_relative(&self.root, entry.path()) else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 path");
                report.skipped.push(entry.path().display().to_string());
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                manifest.dirs.insert(rel);
                continue;
            }
            if !file_type.is_file() {
                tracing::debug!(path = %rel, "skipping non-regular file");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %rel, error = %e, "file vanished during scan");
                    report.skipped.push(rel);
                    continue;
                }
            };

            let (mtime, ctime) = file_times(&metadata);
            let size = metadata.len();

            let cached = previous
                .and_then(|p| p.get(&rel))
                .filter(|r| r.same_stat(mtime, ctime, size))
                .map(|r| r.hash);

            let hash = match cached {
                Some(hash) => {
                    report.reused += 1;
                    hash
                }
                None => match hash_or_skip(entry.path(), &rel, &mut report) {
                    Some(hash) => hash,
                    None => continue,
                },
            };

            manifest.files.insert(
                rel,
                FileRecord {
                    mtime,
                    ctime,
                    size,
                    hash,
                },
            );
        }

        manifest.generated_at = unix_now();
        tracing::debug!(
            files = manifest.file_count(),
            dirs = manifest.dirs.len(),
            hashed = report.hashed,
            reused = report.reused,
            "scan complete"
        );
        Ok((manifest, report))
    }
}

/// Hash a file found by the walk. A file that vanished or cannot be read
/// since it was listed is recorded as skipped instead of failing the scan.
fn hash_or_skip(path: &Path, rel: &str, report: &mut ScanReport) -> Option<ContentHash> {
    match hash_file(path) {
        Ok(hash) => {
            report.hashed += 1;
            Some(hash)
        }
        Err(e) => {
            tracing::warn!(path = %rel, error = %e, "could not hash file, skipping");
            report.skipped.push(rel.to_string());
            None
        }
    }
}

/// Stream a file through SHA-256 in fixed-size chunks.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let mut bytes = [0u8; sync_types::HASH_SIZE];
    bytes.copy_from_slice(&hasher.finalize());
    Ok(ContentHash::from_bytes(bytes))
}

/// `(mtime, ctime)` in nanoseconds since the Unix epoch.
fn file_times(metadata: &Metadata) -> (i64, i64) {
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0);

    #[cfg(unix)]
    let ctime = {
        use std::os::unix::fs::MetadataExt;
        metadata
            .ctime()
            .saturating_mul(1_000_000_000)
            .saturating_add(metadata.ctime_nsec())
    };
    #[cfg(not(unix))]
    let ctime = metadata
        .created()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(mtime);

    (mtime, ctime)
}
