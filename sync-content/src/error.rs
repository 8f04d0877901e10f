//! Error types for sync-content.

use std::path::PathBuf;

use sync_types::{ErrorClass, SyncError};
use thiserror::Error;

/// Errors that can occur while sealing, opening or staging envelopes.
#[derive(Error, Debug)]
pub enum ContentError {
    /// Encryption operation failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Envelope bytes do not follow the wire format.
    #[error("malformed envelope: {reason}")]
    Malformed {
        /// What was wrong with the layout.
        reason: String,
    },

    /// Tag verification failed: wrong key, wrong password or tampered data.
    /// No details provided to prevent timing attacks.
    #[error("integrity check failed")]
    IntegrityCheckFailed,

    /// Staged envelope or source file not found.
    #[error("content not found: {}", path.display())]
    NotFound {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// The codec was not given the key this operation needs.
    #[error("missing key: {0}")]
    MissingKey(&'static str),

    /// Key material could not be loaded, parsed or generated.
    #[error("key error: {0}")]
    Key(String),

    /// Staged path key rejected.
    #[error(transparent)]
    Path(#[from] SyncError),

    /// Filesystem operation on the staging area failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ContentError {
    /// Map onto the shared failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::IntegrityCheckFailed => ErrorClass::Integrity,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Io { .. } => ErrorClass::Io,
            Self::EncryptionFailed(_)
            | Self::Malformed { .. }
            | Self::MissingKey(_)
            | Self::Key(_)
            | Self::Path(_) => ErrorClass::Structural,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}
