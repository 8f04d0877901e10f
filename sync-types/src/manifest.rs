//! Manifest - a point-in-time snapshot of a directory tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::SyncError;

/// Size of a content hash in bytes (SHA-256).
pub const HASH_SIZE: usize = 32;

/// SHA-256 digest of a file's full content.
///
/// Serialized as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; HASH_SIZE]);

impl ContentHash {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Hash an in-memory buffer.
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| SyncError::InvalidHash(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One tracked file. The relative path is the key in [`Manifest::files`].
///
/// Timestamps are nanoseconds since the Unix epoch so that the cache-reuse
/// comparison is exact and survives a JSON round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Modification time (ns since epoch).
    pub mtime: i64,
    /// Status-change time (ns since epoch).
    pub ctime: i64,
    /// Size in bytes.
    pub size: u64,
    /// Digest of the full content.
    pub hash: ContentHash,
}

impl FileRecord {
    /// True when `(mtime, ctime, size)` is identical, meaning the stored hash
    /// may be reused without reading the file.
    pub fn same_stat(&self, mtime: i64, ctime: i64, size: u64) -> bool {
        self.mtime == mtime && self.ctime == ctime && self.size == size
    }
}

/// Snapshot of a directory tree.
///
/// `files` is keyed by slash-separated relative path; `dirs` holds every
/// directory visited during the scan, with `""` for the root, whether or not
/// it contains files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Unix seconds when the scan finished. Informational only.
    pub generated_at: f64,
    /// Tracked files keyed by relative path.
    pub files: BTreeMap<String, FileRecord>,
    /// Directories present during the scan.
    pub dirs: BTreeSet<String>,
}

impl Manifest {
    /// Create an empty manifest stamped with `generated_at`.
    pub fn new(generated_at: f64) -> Self {
        Self {
            generated_at,
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
        }
    }

    /// Manifest of a tree that has never been scanned.
    pub fn empty() -> Self {
        Self::new(0.0)
    }

    /// Look up a file record by relative path.
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    /// Number of tracked files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Sum of all tracked file sizes.
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|r| r.size).sum()
    }

    /// True if any tracked file lives somewhere below `dir`.
    ///
    /// The root (`""`) contains every file.
    pub fn has_files_under(&self, dir: &str) -> bool {
        if dir.is_empty() {
            return !self.files.is_empty();
        }
        let prefix = format!("{dir}/");
        self.files
            .range::<str, _>((
                std::ops::Bound::Included(prefix.as_str()),
                std::ops::Bound::Unbounded,
            ))
            .next()
            .is_some_and(|(path, _)| path.starts_with(&prefix))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, SyncError> {
        serde_json::to_vec_pretty(self).map_err(SyncError::Serialization)
    }

    /// Deserialize from JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(bytes).map_err(SyncError::Deserialization)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &[u8]) -> FileRecord {
        FileRecord {
            mtime: 1_700_000_000_123_456_789,
            ctime: 1_700_000_000_123_456_789,
            size: content.len() as u64,
            hash: ContentHash::of(content),
        }
    }

    #[test]
    fn content_hash_hex_roundtrip() {
        let hash = ContentHash::of(b"hello");
        let parsed: ContentHash = hash.to_hex().parse().unwrap();
        assert_eq!(hash, parsed);
        assert_eq!(
            hash.to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn content_hash_rejects_bad_hex() {
        assert!("abc".parse::<ContentHash>().is_err());
        assert!("zz".repeat(32).parse::<ContentHash>().is_err());
    }

    #[test]
    fn manifest_json_shape() {
        let mut manifest = Manifest::new(1705000000.5);
        manifest.files.insert("a.txt".into(), record(b"hello"));
        manifest.dirs.insert(String::new());

        let value: serde_json::Value =
            serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(value["generated_at"], 1705000000.5);
        assert_eq!(value["files"]["a.txt"]["size"], 5);
        assert_eq!(
            value["files"]["a.txt"]["mtime"],
            1_700_000_000_123_456_789i64
        );
        assert_eq!(value["dirs"], serde_json::json!([""]));

        let restored = Manifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(restored, manifest);
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        assert!(matches!(
            Manifest::from_json(b"{\"files\": 3}"),
            Err(SyncError::Deserialization(_))
        ));
        assert!(Manifest::from_json(b"not json").is_err());
    }

    #[test]
    fn has_files_under_respects_component_boundaries() {
        let mut manifest = Manifest::empty();
        manifest.files.insert("docs/a.txt".into(), record(b"a"));
        manifest.files.insert("docsx/b.txt".into(), record(b"b"));

        assert!(manifest.has_files_under("docs"));
        assert!(manifest.has_files_under("docsx"));
        assert!(!manifest.has_files_under("doc"));
        assert!(!manifest.has_files_under("docs/sub"));
        assert!(manifest.has_files_under(""));
        assert!(!Manifest::empty().has_files_under(""));
    }

    #[test]
    fn same_stat_requires_all_three_fields() {
        let r = record(b"abc");
        assert!(r.same_stat(r.mtime, r.ctime, r.size));
        assert!(!r.same_stat(r.mtime + 1, r.ctime, r.size));
        assert!(!r.same_stat(r.mtime, r.ctime + 1, r.size));
        assert!(!r.same_stat(r.mtime, r.ctime, r.size + 1));
    }
}
