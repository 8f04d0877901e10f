//! # sync-types
//!
//! Data model shared by every dirsync crate.
//!
//! - [`Manifest`] / [`FileRecord`] / [`ContentHash`] - point-in-time snapshot of a tree
//! - [`ChangeSet`] - classified difference between two manifests
//! - [`UpdateJournal`] - durable outbox of changes not yet delivered to the peer
//! - [`Side`] - which of the two replicas this machine is
//! - [`join_relative`] / [`to_relative`] - mapping between `/`-separated keys and local paths
//! - [`SyncError`] / [`ErrorClass`] - error types and the shared failure taxonomy
//!
//! Manifests and journals are persisted as JSON; the codecs live here so the
//! on-disk format has exactly one definition.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod changes;
mod error;
mod manifest;
mod path;
mod side;

pub use changes::{ChangeSet, UpdateJournal, ROOT_DIR_SENTINEL};
pub use error::{ErrorClass, SyncError};
pub use manifest::{ContentHash, FileRecord, Manifest, HASH_SIZE};
pub use path::{join_relative, to_relative};
pub use side::Side;

/// Current wall-clock time as fractional Unix seconds.
///
/// Used for the informational `generated_at` stamps; never compared for
/// ordering decisions.
pub fn unix_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
