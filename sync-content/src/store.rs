//! Staging area for envelopes.
//!
//! Each changed file is sealed into `<root>/<relative path><suffix>`, where
//! the suffix comes from the codec (`.enc` for encrypted modes, nothing for
//! plain copies). The staging directory is what the transport carries to the
//! peer; the peer opens and removes envelopes as it applies them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sync_types::join_relative;

use crate::codec::EnvelopeCodec;
use crate::error::ContentError;

/// Directory of envelopes keyed by relative path.
#[derive(Clone)]
pub struct StagingArea {
    root: PathBuf,
    codec: Arc<dyn EnvelopeCodec>,
}

impl StagingArea {
    /// Create a staging area rooted at `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>, codec: Arc<dyn EnvelopeCodec>) -> Self {
        Self {
            root: root.into(),
            codec,
        }
    }

    /// Root directory of the staged envelopes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Codec used to seal and open envelopes.
    pub fn codec(&self) -> &dyn EnvelopeCodec {
        self.codec.as_ref()
    }

    /// Location of the envelope for `rel`.
    pub fn envelope_path(&self, rel: &str) -> Result<PathBuf, ContentError> {
        let mut path = join_relative(&self.root, rel)?.into_os_string();
        path.push(self.codec.file_suffix());
        Ok(PathBuf::from(path))
    }

    /// Seal `plaintext` and write it as the envelope for `rel`.
    pub fn stage(&self, rel: &str, plaintext: &[u8]) -> Result<PathBuf, ContentError> {
        let path = self.envelope_path(rel)?;
        let sealed = self.codec.seal(plaintext)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ContentError::io(parent, e))?;
        }
        fs::write(&path, sealed).map_err(|e| ContentError::io(&path, e))?;
        tracing::debug!(path = rel, "staged envelope");
        Ok(path)
    }

    /// Read `source` and stage it as the envelope for `rel`.
    ///
    /// A vanished source yields `NotFound`.
    pub fn stage_file(&self, rel: &str, source: &Path) -> Result<PathBuf, ContentError> {
        let plaintext = fs::read(source).map_err(|e| ContentError::io(source, e))?;
        self.stage(rel, &plaintext)
    }

    /// Whether an envelope for `rel` is present.
    pub fn contains(&self, rel: &str) -> bool {
        self.envelope_path(rel).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Read and open the envelope for `rel`.
    ///
    /// Missing envelopes yield `NotFound`; tag mismatches yield
    /// `IntegrityCheckFailed` and no plaintext.
    pub fn open(&self, rel: &str) -> Result<Vec<u8>, ContentError> {
        let path = self.envelope_path(rel)?;
        let sealed = fs::read(&path).map_err(|e| ContentError::io(&path, e))?;
        self.codec.open(&sealed)
    }

    /// Delete the envelope for `rel`.
    ///
    /// Returns `Ok(true)` if removed, `Ok(false)` if it was not there.
    pub fn remove(&self, rel: &str) -> Result<bool, ContentError> {
        let path = self.envelope_path(rel)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ContentError::io(&path, e)),
        }
    }

    /// Wipe every staged envelope and leave an empty root behind.
    pub fn clear(&self) -> Result<(), ContentError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ContentError::io(&self.root, e)),
        }
        fs::create_dir_all(&self.root).map_err(|e| ContentError::io(&self.root, e))
    }

    /// Remove directories left empty below the root, deepest first.
    ///
    /// The root itself is kept. Returns how many directories were removed.
    pub fn prune_empty_dirs(&self) -> Result<usize, ContentError> {
        if !self.root.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        prune_below(&self.root, &mut removed)?;
        Ok(removed)
    }
}

impl std::fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("root", &self.root)
            .field("mode", &self.codec.mode())
            .finish()
    }
}

/// Prune empty subdirectories of `dir`; returns whether `dir` is now empty.
fn prune_below(dir: &Path, removed: &mut usize) -> Result<bool, ContentError> {
    let mut empty = true;
    for entry in fs::read_dir(dir).map_err(|e| ContentError::io(dir, e))? {
        let entry = entry.map_err(|e| ContentError::io(dir, e))?;
        let path = entry.path();
        let is_dir = entry
            .file_type()
            .map_err(|e| ContentError::io(&path, e))?
            .is_dir();

        if is_dir && prune_below(&path, removed)? {
            match fs::remove_dir(&path) {
                Ok(()) => *removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => *removed += 1,
                Err(_) => empty = false,
            }
        } else {
            empty = false;
        }
    }
    Ok(empty)
}
