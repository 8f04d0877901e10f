//! Mock transport for testing.
//!
//! Works on a plain directory and records every call so tests can verify
//! what was staged and published. Failures can be injected per operation.

use super::{StageHandle, Transport, TransportError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Debug)]
pub struct MockTransport {
    dir: PathBuf,
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    fetches: usize,
    staged: Vec<StageHandle>,
    published: Vec<StageHandle>,
    fail_next_fetch: Option<String>,
    fail_next_stage: Option<String>,
    fail_next_publish: Option<String>,
}

impl MockTransport {
    /// Create a mock transport over `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            inner: Arc::default(),
        }
    }

    fn inner(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of completed `fetch()` calls.
    pub fn fetch_count(&self) -> usize {
        self.inner().fetches
    }

    /// Handles returned by `stage()`.
    pub fn staged(&self) -> Vec<StageHandle> {
        self.inner().staged.clone()
    }

    /// Handles passed to `publish()`.
    pub fn published(&self) -> Vec<StageHandle> {
        self.inner().published.clone()
    }

    /// Cause the next fetch() to fail with the given error.
    pub fn fail_next_fetch(&self, error: &str) {
        self.inner().fail_next_fetch = Some(error.to_string());
    }

    /// Cause the next stage() to fail with the given error.
    pub fn fail_next_stage(&self, error: &str) {
        self.inner().fail_next_stage = Some(error.to_string());
    }

    /// Cause the next publish() to fail with the given error.
    pub fn fail_next_publish(&self, error: &str) {
        self.inner().fail_next_publish = Some(error.to_string());
    }

    /// Forget recorded calls and pending failures.
    pub fn reset(&self) {
        *self.inner() = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn exchange_dir(&self) -> &Path {
        &self.dir
    }

    async fn fetch(&self) -> Result<PathBuf, TransportError> {
        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(TransportError::Unavailable(error));
        }
        inner.fetches += 1;
        Ok(self.dir.clone())
    }

    async fn stage(
        &self,
        paths: &[PathBuf],
        message: &str,
    ) -> Result<StageHandle, TransportError> {
        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_stage.take() {
            return Err(TransportError::Unavailable(error));
        }
        let handle = StageHandle::new(paths, message);
        inner.staged.push(handle.clone());
        Ok(handle)
    }

    async fn publish(&self, handle: StageHandle) -> Result<(), TransportError> {
        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_publish.take() {
            return Err(TransportError::Unavailable(error));
        }
        inner.published.push(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls() {
        let transport = MockTransport::new("/exchange");
        assert_eq!(transport.fetch().await.unwrap(), PathBuf::from("/exchange"));

        let handle = transport
            .stage(&[PathBuf::from("/exchange/side-1")], "msg")
            .await
            .unwrap();
        transport.publish(handle).await.unwrap();

        assert_eq!(transport.fetch_count(), 1);
        assert_eq!(transport.staged().len(), 1);
        assert_eq!(transport.published()[0].message(), "msg");
    }

    #[tokio::test]
    async fn forced_failures_fire_once() {
        let transport = MockTransport::new("/exchange");
        transport.fail_next_fetch("offline");

        assert!(matches!(
            transport.fetch().await,
            Err(TransportError::Unavailable(_))
        ));
        assert!(transport.fetch().await.is_ok());
        assert_eq!(transport.fetch_count(), 1);
    }

    #[tokio::test]
    async fn forced_publish_failure() {
        let transport = MockTransport::new("/exchange");
        transport.fail_next_publish("rejected");
        let handle = transport.stage(&[], "m").await.unwrap();

        assert!(transport.publish(handle.clone()).await.is_err());
        transport.publish(handle).await.unwrap();
        assert_eq!(transport.published().len(), 1);
    }

    #[tokio::test]
    async fn clone_shares_state_and_reset_clears() {
        let t1 = MockTransport::new("/exchange");
        let t2 = t1.clone();
        t1.fetch().await.unwrap();
        t2.fetch().await.unwrap();
        assert_eq!(t1.fetch_count(), 2);

        t2.reset();
        assert_eq!(t1.fetch_count(), 0);
    }
}
