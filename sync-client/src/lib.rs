//! # sync-client
//!
//! Filesystem side of dirsync: everything that touches disk or the
//! transport.
//!
//! ## Features
//!
//! - **Snapshot Scanner**: SHA-256 manifests with a stat-triple hash cache
//! - **Snapshot Store**: atomic temp-file-then-rename JSON persistence
//! - **Apply Engine**: deletes, moves, pruning, then content, in fixed order
//! - **Transport Abstraction**: git, shared folder, mock
//! - **Push/Pull Cycles**: [`SyncSession`] ties it together for one side
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dirsync_client::{LocalTransport, SessionConfig, SyncSession};
//! use dirsync_content::PlainCodec;
//! use dirsync_types::Side;
//!
//! let config = SessionConfig {
//!     side: Side::One,
//!     folder: "/home/me/Documents".into(),
//!     manifest_path: "/home/me/.dirsync/manifest.json".into(),
//! };
//! let session = SyncSession::new(config, LocalTransport::new("/mnt/share"), Arc::new(PlainCodec));
//!
//! session.init()?;
//! let report = session.push().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod error;
pub mod scan;
pub mod session;
pub mod state;
pub mod transport;

pub use apply::{apply, ApplyOutcome, ApplyReport, ContentProvider, ItemError};
pub use error::{CycleError, ScanError, StateError};
pub use scan::{hash_file, ScanReport, Scanner, HASH_CHUNK_SIZE};
pub use session::{
    ExchangeLayout, InitReport, ManifestSummary, PullReport, PushReport, SessionConfig,
    StatusReport, SyncSession,
};
pub use state::{load_journal, load_manifest, save_journal, save_manifest};
pub use transport::{
    GitTransport, LocalTransport, MockTransport, StageHandle, Transport, TransportError,
};
