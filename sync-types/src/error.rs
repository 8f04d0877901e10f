//! Error types for dirsync.

use thiserror::Error;

/// Failure taxonomy shared by all crates.
///
/// Every error type in the workspace maps onto one of these classes, and the
/// class alone decides whether a whole cycle aborts or a single item is
/// skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed manifest, journal or envelope. Never partially applied.
    Structural,
    /// MAC mismatch. The item is discarded, never written to the target.
    Integrity,
    /// An expected source file or staged envelope is missing.
    NotFound,
    /// Push/pull through the external transport failed.
    Transport,
    /// Local filesystem failure.
    Io,
}

impl ErrorClass {
    /// Whether an error of this class aborts the whole cycle.
    ///
    /// Integrity and not-found failures only ever affect a single item.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Structural | Self::Transport | Self::Io)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Structural => "structural",
            Self::Integrity => "integrity",
            Self::NotFound => "not-found",
            Self::Transport => "transport",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Errors raised by the data-model codecs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed (malformed manifest or journal)
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// A content hash was not 64 lowercase hex characters
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// Side number outside 1..=2
    #[error("invalid side: {0} (expected 1 or 2)")]
    InvalidSide(u8),

    /// Relative path that is empty, absolute or escapes its root
    #[error("invalid relative path: {0:?}")]
    InvalidPath(String),
}

impl SyncError {
    /// Classify this error. All codec errors are structural.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Structural
    }
}
