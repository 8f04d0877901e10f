//! SyncSession - push and pull cycles for one side.
//!
//! A session binds this side's folder and manifest to a transport and an
//! envelope codec. The exchange directory holds one outbox per side:
//!
//! ```text
//! <exchange>/side-1/journal.json   pending changes from side 1
//! <exchange>/side-1/files/...      side 1's staged envelopes
//! <exchange>/side-2/...            same for side 2
//! ```
//!
//! Each side writes only its own outbox. The receiver consumes the peer's
//! envelopes and clears the peer's journal once applied.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sync_content::{ContentError, EnvelopeCodec, StagingArea};
use sync_core::{diff, merge};
use sync_types::{join_relative, unix_now, ChangeSet, Manifest, Side, UpdateJournal};

use crate::apply::{apply, ApplyReport};
use crate::error::CycleError;
use crate::scan::{ScanReport, Scanner};
use crate::state::{load_journal, load_manifest, save_journal, save_manifest};
use crate::transport::Transport;

/// File name of a side's journal inside its outbox.
pub const JOURNAL_FILE: &str = "journal.json";

/// Directory name of a side's staged envelopes inside its outbox.
pub const FILES_DIR: &str = "files";

/// Paths inside the exchange directory.
#[derive(Debug, Clone)]
pub struct ExchangeLayout {
    root: PathBuf,
}

impl ExchangeLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Outbox directory of `side`.
    pub fn side_dir(&self, side: Side) -> PathBuf {
        self.root.join(side.dir_name())
    }

    /// Journal file of `side`.
    pub fn journal_path(&self, side: Side) -> PathBuf {
        self.side_dir(side).join(JOURNAL_FILE)
    }

    /// Staged envelope directory of `side`.
    pub fn files_dir(&self, side: Side) -> PathBuf {
        self.side_dir(side).join(FILES_DIR)
    }
}

/// Static configuration of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Which side this machine is.
    pub side: Side,
    /// Synced folder.
    pub folder: PathBuf,
    /// Persisted manifest of `folder`.
    pub manifest_path: PathBuf,
}

/// What `init` created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Journal files created (both sides).
    pub journals_created: usize,
    /// Whether a fresh manifest was written.
    pub manifest_created: bool,
    /// Files recorded in the manifest (existing or new).
    pub files: usize,
}

/// Outcome of a push.
#[derive(Debug, Clone, Default)]
pub struct PushReport {
    /// Changes found by this cycle's diff.
    pub changes: ChangeSet,
    /// Entries pending in the merged outbox.
    pub pending: usize,
    /// Envelopes written to the staging area.
    pub staged: usize,
    /// Files listed in the outbox but gone from the folder.
    pub skipped: Vec<String>,
    /// Whether the outbox was published.
    pub published: bool,
    /// Scan counters.
    pub scan: ScanReport,
}

/// Outcome of a pull.
#[derive(Debug, Clone, Default)]
pub struct PullReport {
    /// Apply details; `None` when the peer had nothing pending.
    pub applied: Option<ApplyReport>,
    /// Consumed envelopes removed from the peer's staging area.
    pub envelopes_removed: usize,
}

impl PullReport {
    /// True when there was nothing to apply.
    pub fn no_updates(&self) -> bool {
        self.applied.is_none()
    }
}

/// Summary of a persisted manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSummary {
    /// Tracked files.
    pub files: usize,
    /// Directories recorded.
    pub dirs: usize,
    /// Sum of file sizes.
    pub total_size: u64,
    /// Unix seconds of the scan.
    pub generated_at: f64,
}

/// Local view of the sync state; no transport calls.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// This side.
    pub side: Side,
    /// Manifest summary, `None` before init.
    pub manifest: Option<ManifestSummary>,
    /// Entries waiting in our outbox.
    pub outbox_pending: usize,
    /// Entries waiting in the peer's outbox (as of the last fetch).
    pub inbox_pending: usize,
}

/// Push/pull driver for one side.
pub struct SyncSession<T: Transport> {
    config: SessionConfig,
    transport: T,
    codec: Arc<dyn EnvelopeCodec>,
}

impl<T: Transport> SyncSession<T> {
    /// Create a session.
    pub fn new(config: SessionConfig, transport: T, codec: Arc<dyn EnvelopeCodec>) -> Self {
        Self {
            config,
            transport,
            codec,
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get a reference to the transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn layout_at(&self, exchange: &Path) -> ExchangeLayout {
        ExchangeLayout::new(exchange)
    }

    fn staging(&self, layout: &ExchangeLayout, side: Side) -> StagingArea {
        StagingArea::new(layout.files_dir(side), Arc::clone(&self.codec))
    }

    fn load_previous(&self) -> Result<Manifest, CycleError> {
        load_manifest(&self.config.manifest_path)?.ok_or_else(|| CycleError::NotInitialized {
            path: self.config.manifest_path.clone(),
        })
    }

    fn publish_message(&self) -> String {
        format!("{} dirsync: {:.0}", self.config.side, unix_now())
    }

    /// Prepare both outboxes and the initial manifest.
    ///
    /// Existing journals and an existing manifest are left untouched.
    pub fn init(&self) -> Result<InitReport, CycleError> {
        let layout = self.layout_at(self.transport.exchange_dir());
        let mut report = InitReport::default();

        for side in [Side::One, Side::Two] {
            let files = layout.files_dir(side);
            std::fs::create_dir_all(&files).map_err(|source| {
                CycleError::Content(ContentError::Io {
                    path: files.clone(),
                    source,
                })
            })?;
            let journal = layout.journal_path(side);
            if !journal.exists() {
                save_journal(&journal, &UpdateJournal::empty(unix_now()))?;
                report.journals_created += 1;
            }
        }

        match load_manifest(&self.config.manifest_path)? {
            Some(existing) => {
                report.files = existing.file_count();
                tracing::info!(path = %self.config.manifest_path.display(), "manifest already exists");
            }
            None => {
                let (manifest, _) = Scanner::new(&self.config.folder).scan(None)?;
                save_manifest(&self.config.manifest_path, &manifest)?;
                report.manifest_created = true;
                report.files = manifest.file_count();
                tracing::info!(
                    path = %self.config.manifest_path.display(),
                    files = report.files,
                    "initialized manifest"
                );
            }
        }
        Ok(report)
    }

    /// Record local changes in our outbox, stage their content and publish.
    ///
    /// Transport failures abort before the manifest is replaced, so the same
    /// changes are found again by the next push.
    pub async fn push(&self) -> Result<PushReport, CycleError> {
        let side = self.config.side;
        let exchange = self.transport.fetch().await?;
        let layout = self.layout_at(&exchange);

        let previous = self.load_previous()?;
        let (current, scan) = Scanner::new(&self.config.folder).scan(Some(&previous))?;
        let changes = diff(&previous, &current);

        let outbox_path = layout.journal_path(side);
        let existing = load_journal(&outbox_path)?;
        let merged = merge(&existing, &changes, unix_now());
        save_journal(&outbox_path, &merged)?;
        tracing::info!(
            added = changes.added.len(),
            deleted = changes.deleted.len(),
            modified = changes.modified.len(),
            moved = changes.moved.len(),
            deleted_dirs = changes.deleted_dirs.len(),
            pending = merged.changes.len(),
            "updates recorded"
        );

        // Restage everything still pending so undelivered earlier changes
        // keep their envelopes.
        let staging = self.staging(&layout, side);
        staging.clear()?;
        let mut report = PushReport {
            pending: merged.changes.len(),
            scan,
            ..PushReport::default()
        };
        for rel in merged.changes.content_paths() {
            let source = join_relative(&self.config.folder, rel).map_err(ContentError::from)?;
            match staging.stage_file(rel, &source) {
                Ok(_) => report.staged += 1,
                Err(ContentError::NotFound { .. }) => {
                    tracing::warn!(path = %rel, "source not found for staging, skipping");
                    report.skipped.push(rel.to_string());
                }
                Err(e) => return Err(e.into()),
            }
        }

        if !merged.is_empty() {
            let handle = self
                .transport
                .stage(&[layout.side_dir(side)], &self.publish_message())
                .await?;
            self.transport.publish(handle).await?;
            report.published = true;
        }

        save_manifest(&self.config.manifest_path, &current)?;
        report.changes = changes;
        Ok(report)
    }

    /// Apply the peer's pending changes to our folder and clear its outbox.
    ///
    /// A failed fetch aborts before anything local is touched, and so does a
    /// codec that holds no key to open the peer's envelopes with.
    pub async fn pull(&self) -> Result<PullReport, CycleError> {
        let peer = self.config.side.peer();
        let exchange = self.transport.fetch().await?;
        let layout = self.layout_at(&exchange);

        let previous = self.load_previous()?;
        let inbox_path = layout.journal_path(peer);
        let journal = load_journal(&inbox_path)?;
        if journal.is_empty() {
            tracing::info!("no updates");
            return Ok(PullReport::default());
        }
        if !self.codec.can_open() {
            tracing::error!(
                pending = journal.changes.len(),
                mode = %self.codec.mode(),
                "cannot open envelopes, leaving peer outbox untouched"
            );
            return Err(ContentError::MissingKey("private key").into());
        }

        let staging = self.staging(&layout, peer);
        let outcome = apply(&journal, &self.config.folder, &staging, &previous)?;
        save_manifest(&self.config.manifest_path, &outcome.manifest)?;

        let mut envelopes_removed = 0;
        for rel in journal.changes.content_paths() {
            match staging.remove(rel) {
                Ok(true) => envelopes_removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(path = %rel, error = %e, "could not remove envelope"),
            }
        }
        if let Err(e) = staging.prune_empty_dirs() {
            tracing::warn!(error = %e, "could not prune staging area");
        }

        save_journal(&inbox_path, &outcome.journal)?;
        let handle = self
            .transport
            .stage(&[layout.side_dir(peer)], &self.publish_message())
            .await?;
        self.transport.publish(handle).await?;

        Ok(PullReport {
            applied: Some(outcome.report),
            envelopes_removed,
        })
    }

    /// Summarize local state without contacting the transport.
    pub fn status(&self) -> Result<StatusReport, CycleError> {
        let layout = self.layout_at(self.transport.exchange_dir());
        let manifest = load_manifest(&self.config.manifest_path)?.map(|m| ManifestSummary {
            files: m.file_count(),
            dirs: m.dirs.len(),
            total_size: m.total_size(),
            generated_at: m.generated_at,
        });
        let outbox = load_journal(&layout.journal_path(self.config.side))?;
        let inbox = load_journal(&layout.journal_path(self.config.side.peer()))?;

        Ok(StatusReport {
            side: self.config.side,
            manifest,
            outbox_pending: outbox.changes.len(),
            inbox_pending: inbox.changes.len(),
        })
    }
}

impl<T: Transport> std::fmt::Debug for SyncSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("config", &self.config)
            .field("mode", &self.codec.mode())
            .finish()
    }
}
