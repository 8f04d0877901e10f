//! Change sets and the update journal.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::SyncError;

/// Token used in `deleted_dirs` when the synced root itself disappeared.
///
/// An empty string is ambiguous in a path list, so the root is written as
/// `"."` instead.
pub const ROOT_DIR_SENTINEL: &str = ".";

/// Classified difference between two manifests.
///
/// All fields are ordered sets, so serialization is deterministic and a
/// path can appear at most once per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Paths present only in the new manifest.
    pub added: BTreeSet<String>,
    /// Paths present only in the old manifest.
    pub deleted: BTreeSet<String>,
    /// Paths present in both with different content hashes.
    pub modified: BTreeSet<String>,
    /// `(old_path, new_path)` pairs matched by content hash.
    pub moved: BTreeSet<(String, String)>,
    /// Directories that vanished and hold no tracked files any more.
    pub deleted_dirs: BTreeSet<String>,
}

impl ChangeSet {
    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.deleted.is_empty()
            && self.modified.is_empty()
            && self.moved.is_empty()
            && self.deleted_dirs.is_empty()
    }

    /// Total number of entries across all five fields.
    pub fn len(&self) -> usize {
        self.added.len()
            + self.deleted.len()
            + self.modified.len()
            + self.moved.len()
            + self.deleted_dirs.len()
    }

    /// Paths whose content must be staged for the peer, adds first.
    pub fn content_paths(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .map(String::as_str)
    }
}

/// Durable outbox of changes not yet delivered to the peer.
///
/// Same shape as [`ChangeSet`] plus a merge timestamp. On disk:
///
/// ```json
/// {"generated_at": 1.0, "added": [], "deleted": [], "modified": [],
///  "moved": [["old", "new"]], "deleted_dirs": []}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateJournal {
    /// Unix seconds of the last merge or clear. Informational only.
    pub generated_at: f64,
    /// Pending changes.
    #[serde(flatten)]
    pub changes: ChangeSet,
}

impl UpdateJournal {
    /// Journal with no pending changes.
    pub fn empty(generated_at: f64) -> Self {
        Self {
            generated_at,
            changes: ChangeSet::default(),
        }
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
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
