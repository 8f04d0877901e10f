//! Apply engine.
//!
//! Mutates a target tree to match a received journal. The order is fixed:
//!
//! 1. deletes
//! 2. moves
//! 3. empty-directory pruning
//! 4. adds, then modifications (content from a [`ContentProvider`])
//! 5. rescan against the pre-apply manifest
//! 6. clear the journal
//!
//! Every path is handled independently. Missing targets and missing move
//! sources are warnings; content that cannot be provided is a per-item
//! error. Neither stops the batch, so re-running the same journal is safe.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sync_content::{ContentError, StagingArea};
use sync_core::clear;
use sync_types::{join_relative, unix_now, ErrorClass, Manifest, UpdateJournal, ROOT_DIR_SENTINEL};

use crate::error::ScanError;
use crate::scan::{ScanReport, Scanner};
use crate::state::write_atomic;

/// Source of decrypted file bodies keyed by relative path.
pub trait ContentProvider {
    /// Plaintext for `rel`, or why it is unavailable.
    fn provide(&self, rel: &str) -> Result<Vec<u8>, ContentError>;
}

impl ContentProvider for StagingArea {
    fn provide(&self, rel: &str) -> Result<Vec<u8>, ContentError> {
        self.open(rel)
    }
}

/// A single path that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    /// Relative path of the item.
    pub path: String,
    /// Failure class.
    pub class: ErrorClass,
    /// Human-readable cause.
    pub message: String,
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.class, self.message)
    }
}

/// Outcome of one apply run.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Files or trees removed.
    pub deleted: usize,
    /// Files moved.
    pub moved: usize,
    /// Empty directories removed.
    pub pruned: usize,
    /// Files written from added entries.
    pub added: usize,
    /// Files written from modified entries.
    pub updated: usize,
    /// Non-fatal conditions (already deleted, move source gone).
    pub warnings: Vec<String>,
    /// Items that could not be applied.
    pub errors: Vec<ItemError>,
    /// Rescan counters.
    pub scan: ScanReport,
}

impl ApplyReport {
    /// True when every item applied without error.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    fn fail(&mut self, path: &str, class: ErrorClass, message: String) {
        tracing::error!(path, %class, "{message}");
        self.errors.push(ItemError {
            path: path.to_string(),
            class,
            message,
        });
    }
}

/// Result of applying a journal: the report, the refreshed manifest and
/// the cleared journal to persist.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// What happened, item by item.
    pub report: ApplyReport,
    /// Manifest of the target tree after apply.
    pub manifest: Manifest,
    /// The journal, now empty.
    pub journal: UpdateJournal,
}

/// Apply `journal` to `target`.
///
/// `previous` is the target's last persisted manifest; it seeds the hash
/// cache for the closing rescan.
///
/// # Errors
/// Only the closing rescan can fail the call as a whole.
pub fn apply(
    journal: &UpdateJournal,
    target: &Path,
    provider: &dyn ContentProvider,
    previous: &Manifest,
) -> Result<ApplyOutcome, ScanError> {
    let changes = &journal.changes;
    let mut report = ApplyReport::default();

    for rel in &changes.deleted {
        apply_delete(target, rel, &mut report);
    }

    for (old, new) in &changes.moved {
        apply_move(target, old, new, &mut report);
    }

    let mut dirs: Vec<&str> = changes.deleted_dirs.iter().map(String::as_str).collect();
    // Deepest first so a parent is considered only after its children.
    dirs.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| b.cmp(a)));
    for rel in dirs {
        report.pruned += prune_dir(target, rel);
    }

    for rel in &changes.added {
        if write_content(target, rel, provider, &mut report) {
            report.added += 1;
            tracing::info!(path = %rel, "added");
        }
    }
    for rel in &changes.modified {
        if write_content(target, rel, provider, &mut report) {
            report.updated += 1;
            tracing::info!(path = %rel, "updated");
        }
    }

    let (manifest, scan) = Scanner::new(target).scan(Some(previous))?;
    report.scan = scan;

    Ok(ApplyOutcome {
        report,
        manifest,
        journal: clear(unix_now()),
    })
}

fn depth(rel: &str) -> usize {
    rel.split('/').count()
}

fn resolve(target: &Path, rel: &str, report: &mut ApplyReport) -> Option<PathBuf> {
    match join_relative(target, rel) {
        Ok(path) => Some(path),
        Err(e) => {
            report.fail(rel, e.class(), e.to_string());
            None
        }
    }
}

fn apply_delete(target: &Path, rel: &str, report: &mut ApplyReport) {
    let Some(path) = resolve(target, rel, report) else {
        return;
    };
    let result = match fs::symlink_metadata(&path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
        Ok(_) => fs::remove_file(&path),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            report.deleted += 1;
            tracing::info!(path = %rel, "deleted");
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            report.warn(format!("target not found for delete: {rel}"));
        }
        Err(e) => report.fail(rel, ErrorClass::Io, format!("delete failed: {e}")),
    }
}

fn apply_move(target: &Path, old: &str, new: &str, report: &mut ApplyReport) {
    let (Some(src), Some(dst)) = (resolve(target, old, report), resolve(target, new, report))
    else {
        return;
    };
    if fs::symlink_metadata(&src).is_err() {
        report.warn(format!("source not found for move: {old}"));
        return;
    }
    let result = dst
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::rename(&src, &dst));
    match result {
        Ok(()) => {
            report.moved += 1;
            tracing::info!(from = %old, to = %new, "moved");
        }
        Err(e) => report.fail(new, ErrorClass::Io, format!("move from {old} failed: {e}")),
    }
}

/// Remove `rel` if empty, then each empty parent up to but excluding the
/// root. Failures are tolerated silently.
fn prune_dir(target: &Path, rel: &str) -> usize {
    if rel == ROOT_DIR_SENTINEL || rel.is_empty() {
        return 0;
    }
    let Ok(mut dir) = join_relative(target, rel) else {
        return 0;
    };

    let mut removed = 0;
    while dir != target && dir.starts_with(target) {
        if fs::remove_dir(&dir).is_err() {
            break;
        }
        tracing::info!(path = %dir.display(), "removed empty directory");
        removed += 1;
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }
    removed
}

/// Write the provided body for `rel` into place. Returns whether it landed.
fn write_content(
    target: &Path,
    rel: &str,
    provider: &dyn ContentProvider,
    report: &mut ApplyReport,
) -> bool {
    let Some(dst) = resolve(target, rel, report) else {
        return false;
    };
    let plaintext = match provider.provide(rel) {
        Ok(bytes) => bytes,
        Err(e) => {
            report.fail(rel, e.class(), e.to_string());
            return false;
        }
    };
    match write_atomic(&dst, &plaintext) {
        Ok(()) => true,
        Err(e) => {
            report.fail(rel, e.class(), e.to_string());
            false
        }
    }
}
