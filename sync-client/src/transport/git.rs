//! Git transport.
//!
//! The exchange directory is a clone of a shared repository. Fetch pulls the
//! branch; publish commits the staged paths (only when the index differs
//! from HEAD) and pushes. An access token, if configured, is spliced into
//! `https://` remotes and redacted from every error.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use super::{check_below, StageHandle, Transport, TransportError};

/// Transport backed by the `git` command line.
#[derive(Clone)]
pub struct GitTransport {
    repo: PathBuf,
    branch: String,
    remote: Option<String>,
    token: Option<String>,
    commit_prefix: Option<String>,
}

impl GitTransport {
    /// Create a transport for the working copy at `repo`, tracking `branch`.
    pub fn new(repo: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            remote: None,
            token: None,
            commit_prefix: None,
        }
    }

    /// Point `origin` at `url` before each fetch.
    pub fn with_remote(mut self, url: impl Into<String>) -> Self {
        self.remote = Some(url.into());
        self
    }

    /// Access token for `https://` remotes.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Text prepended to every commit message.
    pub fn with_commit_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.commit_prefix = Some(prefix.into()).filter(|p: &String| !p.is_empty());
        self
    }

    /// Remote URL with the token spliced in, if both apply.
    fn authenticated_url(&self) -> Option<String> {
        let remote = self.remote.as_ref()?;
        match (&self.token, remote.strip_prefix("https://")) {
            (Some(token), Some(rest)) => Some(format!("https://{token}@{rest}")),
            _ => Some(remote.clone()),
        }
    }

    fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) => text.replace(token.as_str(), "***"),
            None => text.to_string(),
        }
    }

    fn command_line(&self, args: &[&str]) -> String {
        self.redact(&format!("git {}", args.join(" ")))
    }

    async fn output(&self, args: &[&str]) -> Result<Output, TransportError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| TransportError::Spawn {
                command: self.command_line(args),
                source,
            })
    }

    async fn run(&self, args: &[&str]) -> Result<(), TransportError> {
        tracing::debug!(command = %self.command_line(args), "running");
        let output = self.output(args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(self.failure(args, &output))
        }
    }

    fn failure(&self, args: &[&str], output: &Output) -> TransportError {
        TransportError::CommandFailed {
            command: self.command_line(args),
            code: output.status.code(),
            stderr: self.redact(String::from_utf8_lossy(&output.stderr).trim()),
        }
    }

    /// Whether the index differs from HEAD.
    async fn has_staged_changes(&self) -> Result<bool, TransportError> {
        let args = ["diff", "--cached", "--quiet"];
        let output = self.output(&args).await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(self.failure(&args, &output)),
        }
    }

    async fn set_origin(&self) -> Result<(), TransportError> {
        if let Some(url) = self.authenticated_url() {
            self.run(&["remote", "set-url", "origin", &url]).await?;
        }
        Ok(())
    }
}

// Don't leak the token in debug output
impl std::fmt::Debug for GitTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitTransport")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("remote", &self.remote)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl Transport for GitTransport {
    fn exchange_dir(&self) -> &Path {
        &self.repo
    }

    async fn fetch(&self) -> Result<PathBuf, TransportError> {
        self.set_origin().await?;
        self.run(&["pull", "origin", &self.branch]).await?;
        tracing::info!(branch = %self.branch, "pulled latest changes");
        Ok(self.repo.clone())
    }

    async fn stage(
        &self,
        paths: &[PathBuf],
        message: &str,
    ) -> Result<StageHandle, TransportError> {
        check_below(&self.repo, paths)?;
        let shown: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let mut args = vec!["add", "-A", "--"];
        args.extend(shown.iter().map(String::as_str));
        self.run(&args).await?;
        Ok(StageHandle::new(paths, message))
    }

    async fn publish(&self, handle: StageHandle) -> Result<(), TransportError> {
        if self.has_staged_changes().await? {
            let message = match &self.commit_prefix {
                Some(prefix) => format!("{prefix} {}", handle.message()),
                None => handle.message().to_string(),
            };
            self.run(&["commit", "-m", &message]).await?;
        } else {
            tracing::debug!("nothing to commit");
        }
        self.set_origin().await?;
        self.run(&["push", "origin", &self.branch]).await?;
        tracing::info!(branch = %self.branch, "pushed changes");
        Ok(())
    }
}
