//! Shared-folder transport.
//!
//! The exchange directory is already visible to both sides (network share,
//! synced folder, or both sides on one machine). Fetch and publish only make
//! sure the directory exists.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{check_below, StageHandle, Transport, TransportError};

/// Transport over a directory both sides can reach.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    dir: PathBuf,
}

impl LocalTransport {
    /// Create a transport for the shared directory `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn exchange_dir(&self) -> &Path {
        &self.dir
    }

    async fn fetch(&self) -> Result<PathBuf, TransportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| TransportError::Io {
                path: self.dir.clone(),
                source,
            })?;
        Ok(self.dir.clone())
    }

    async fn stage(
        &self,
        paths: &[PathBuf],
        message: &str,
    ) -> Result<StageHandle, TransportError> {
        check_below(&self.dir, paths)?;
        Ok(StageHandle::new(paths, message))
    }

    async fn publish(&self, handle: StageHandle) -> Result<(), TransportError> {
        tracing::debug!(
            paths = handle.paths().len(),
            message = handle.message(),
            "published to shared folder"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn fetch_creates_exchange_dir() {
        let dir = tempdir().unwrap();
        let exchange = dir.path().join("exchange");
        let transport = LocalTransport::new(&exchange);

        assert_eq!(transport.fetch().await.unwrap(), exchange);
        assert!(exchange.is_dir());
    }

    #[tokio::test]
    async fn stage_and_publish() {
        let dir = tempdir().unwrap();
        let transport = LocalTransport::new(dir.path());

        let handle = transport
            .stage(&[dir.path().join("side-1")], "side 1 dirsync")
            .await
            .unwrap();
        assert_eq!(handle.message(), "side 1 dirsync");
        transport.publish(handle).await.unwrap();
    }

    #[tokio::test]
    async fn stage_rejects_foreign_paths() {
        let dir = tempdir().unwrap();
        let transport = LocalTransport::new(dir.path().join("exchange"));
        let result = transport.stage(&[dir.path().join("elsewhere")], "m").await;
        assert!(matches!(result, Err(TransportError::OutsideExchange { .. })));
    }
}
