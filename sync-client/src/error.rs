//! Error types for sync-client.

use std::path::PathBuf;

use sync_content::ContentError;
use sync_types::{ErrorClass, SyncError};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors from loading or saving persisted manifests and journals.
#[derive(Debug, Error)]
pub enum StateError {
    /// File exists but is not a valid manifest or journal.
    #[error("corrupt state file {}: {source}", path.display())]
    Corrupt {
        /// Offending file.
        path: PathBuf,
        /// Decoding failure.
        #[source]
        source: SyncError,
    },

    /// Encoding failed before anything was written.
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        /// Destination file.
        path: PathBuf,
        /// Encoding failure.
        #[source]
        source: SyncError,
    },

    /// Filesystem failure while reading or replacing the file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl StateError {
    /// Map onto the shared failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Corrupt { .. } | Self::Encode { .. } => ErrorClass::Structural,
            Self::Io { .. } => ErrorClass::Io,
        }
    }
}

/// Errors that stop a scan as a whole.
///
/// Individual files that vanish or cannot be read are skipped, not reported
/// here.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root directory is missing or unreadable.
    #[error("cannot scan {}: {source}", path.display())]
    Root {
        /// Root that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The root exists but is not a directory.
    #[error("not a directory: {}", path.display())]
    NotADirectory {
        /// Root that was requested.
        path: PathBuf,
    },
}

impl ScanError {
    /// Map onto the shared failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Io
    }
}

/// Errors that abort a whole push or pull cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// No manifest yet; `init` has not been run.
    #[error("manifest not found: {} (run init first)", path.display())]
    NotInitialized {
        /// Expected manifest location.
        path: PathBuf,
    },

    /// Manifest or journal could not be loaded or saved.
    #[error(transparent)]
    State(#[from] StateError),

    /// Synced folder could not be scanned.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Transport step failed; nothing was exchanged this cycle.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Staging area failure that is not tied to a single file.
    #[error("staging failed: {0}")]
    Content(#[from] ContentError),
}

impl CycleError {
    /// Map onto the shared failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotInitialized { .. } => ErrorClass::Structural,
            Self::State(e) => e.class(),
            Self::Scan(e) => e.class(),
            Self::Transport(e) => e.class(),
            Self::Content(e) => e.class(),
        }
    }
}
