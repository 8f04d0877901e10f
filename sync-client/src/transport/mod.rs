//! Transport abstraction for dirsync.
//!
//! The exchange directory is a working copy that both sides can see after a
//! transport round trip. The engine only needs three operations:
//!
//! - `fetch()` brings the exchange directory up to date with the peer
//! - `stage()` marks paths below it for publication
//! - `publish()` makes staged paths visible to the peer
//!
//! Any failure means nothing was exchanged this cycle; retrying later is
//! always safe.
//!
//! # Example
//!
//! ```ignore
//! let transport = LocalTransport::new("/mnt/shared/dirsync");
//! let exchange = transport.fetch().await?;
//! let handle = transport.stage(&[exchange.join("side-1")], "side 1 dirsync").await?;
//! transport.publish(handle).await?;
//! ```

mod git;
mod local;
mod mock;

pub use git::GitTransport;
pub use local::LocalTransport;
pub use mock::MockTransport;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sync_types::ErrorClass;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// External command could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// Command line, with secrets redacted.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// External command exited unsuccessfully.
    #[error("`{command}` failed ({}): {stderr}", exit_code(*code))]
    CommandFailed {
        /// Command line, with secrets redacted.
        command: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Trimmed standard error, with secrets redacted.
        stderr: String,
    },

    /// Path handed to `stage()` lies outside the exchange directory.
    #[error("path outside exchange directory: {}", path.display())]
    OutsideExchange {
        /// Offending path.
        path: PathBuf,
    },

    /// Exchange directory could not be prepared.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Transport not reachable.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Map onto the shared failure taxonomy. Always fatal for the cycle.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Transport
    }
}

fn exit_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Opaque record of what `stage()` accepted, consumed by `publish()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageHandle {
    paths: Vec<PathBuf>,
    message: String,
}

impl StageHandle {
    fn new(paths: &[PathBuf], message: &str) -> Self {
        Self {
            paths: paths.to_vec(),
            message: message.to_string(),
        }
    }

    /// Staged paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Description recorded with the publication.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Transport trait for exchanging the staging directory with the peer.
///
/// Implementations handle the underlying mechanism (git remote, shared
/// folder, mock).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Local working copy both sides exchange.
    fn exchange_dir(&self) -> &Path;

    /// Retrieve whatever the peer published and return the exchange directory.
    async fn fetch(&self) -> Result<PathBuf, TransportError>;

    /// Mark `paths` (below the exchange directory) for publication.
    async fn stage(&self, paths: &[PathBuf], message: &str)
        -> Result<StageHandle, TransportError>;

    /// Make staged paths visible to the peer.
    async fn publish(&self, handle: StageHandle) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange_dir(&self) -> &Path {
        (**self).exchange_dir()
    }

    async fn fetch(&self) -> Result<PathBuf, TransportError> {
        (**self).fetch().await
    }

    async fn stage(
        &self,
        paths: &[PathBuf],
        message: &str,
    ) -> Result<StageHandle, TransportError> {
        (**self).stage(paths, message).await
    }

    async fn publish(&self, handle: StageHandle) -> Result<(), TransportError> {
        (**self).publish(handle).await
    }
}

/// Reject paths that are not below `exchange`.
fn check_below(exchange: &Path, paths: &[PathBuf]) -> Result<(), TransportError> {
    match paths.iter().find(|p| !p.starts_with(exchange)) {
        Some(path) => Err(TransportError::OutsideExchange { path: path.clone() }),
        None => Ok(()),
    }
}
