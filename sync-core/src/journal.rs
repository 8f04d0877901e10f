//! Update journal accumulation.
//!
//! The journal is the outbox of changes not yet delivered to the peer. Each
//! push unions a fresh [`ChangeSet`] into it; a successful apply on the
//! peer clears it. Moves are merged as atomic `(old, new)` pairs.

use sync_types::{ChangeSet, UpdateJournal};

/// Union `incoming` into `existing`, stamping the result with `stamped_at`.
///
/// Idempotent: merging the same change set twice yields the same pending
/// changes as merging it once.
pub fn merge(existing: &UpdateJournal, incoming: &ChangeSet, stamped_at: f64) -> UpdateJournal {
    let mut changes = existing.changes.clone();
    changes.added.extend(incoming.added.iter().cloned());
    changes.deleted.extend(incoming.deleted.iter().cloned());
    changes.modified.extend(incoming.modified.iter().cloned());
    changes.moved.extend(incoming.moved.iter().cloned());
    changes
        .deleted_dirs
        .extend(incoming.deleted_dirs.iter().cloned());

    UpdateJournal {
        generated_at: stamped_at,
        changes,
    }
}

/// Reset every pending field to empty, keeping the record itself.
pub fn clear(stamped_at: f64) -> UpdateJournal {
    UpdateJournal::empty(stamped_at)
}
