//! Settings loading for dirsync.
//!
//! Settings are loaded from a TOML file (default: `dirsync.toml`). Relative
//! paths are resolved against the directory holding the settings file.
//!
//! ```toml
//! side = 1
//! folder = "/home/me/Documents"
//! manifest = "state/manifest.json"
//! exchange_dir = "/home/me/dirsync-exchange"
//!
//! [envelope]
//! mode = "public-key"            # or "password", "plain"
//! public_key = "keys/peer.pub.pem"
//! private_key = "keys/me.pem"
//!
//! [git]
//! remote = "https://github.com/me/exchange.git"
//! branch = "main"
//! token_env = "DIRSYNC_GIT_TOKEN"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use sync_content::{EnvelopeConfig, EnvelopeMode, MIN_PBKDF2_ITERATIONS};
use sync_types::Side;

/// Root settings for one side.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Which side this machine is (1 or 2).
    pub side: Side,
    /// Synced folder.
    pub folder: PathBuf,
    /// Persisted manifest of `folder`.
    pub manifest: PathBuf,
    /// Working copy shared with the peer through the transport.
    pub exchange_dir: PathBuf,
    /// Envelope configuration.
    #[serde(default)]
    pub envelope: EnvelopeSettings,
    /// Git transport; absent means the exchange directory is a shared folder.
    pub git: Option<GitSettings>,
}

/// Envelope configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeSettings {
    /// Key establishment mode (default: public-key).
    #[serde(default = "default_mode")]
    pub mode: EnvelopeMode,
    /// Peer's public key (PEM), needed to push in public-key mode.
    pub public_key: Option<PathBuf>,
    /// Own private key (PEM), needed to pull in public-key mode.
    pub private_key: Option<PathBuf>,
    /// Environment variable holding the shared password (default: DIRSYNC_PASSWORD).
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// PBKDF2 iterations in password mode (default and minimum: 200000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
}

/// Git transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GitSettings {
    /// Remote URL set as `origin` before each fetch (optional).
    pub remote: Option<String>,
    /// Branch to pull and push (default: main).
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Environment variable holding an access token for https remotes.
    pub token_env: Option<String>,
    /// Text prepended to commit messages.
    #[serde(default)]
    pub commit_prefix: String,
}

// Default value functions
fn default_mode() -> EnvelopeMode {
    EnvelopeMode::PublicKey
}

fn default_password_env() -> String {
    "DIRSYNC_PASSWORD".to_string()
}

fn default_pbkdf2_iterations() -> u32 {
    MIN_PBKDF2_ITERATIONS
}

fn default_branch() -> String {
    "main".to_string()
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            public_key: None,
            private_key: None,
            password_env: default_password_env(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
        }
    }
}

impl EnvelopeSettings {
    /// Codec configuration derived from these settings.
    pub fn config(&self) -> EnvelopeConfig {
        EnvelopeConfig::new(self.mode).with_iterations(self.pbkdf2_iterations)
    }
}

impl Settings {
    /// Load settings from a TOML file, resolve relative paths and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut settings: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(base) = path.parent() {
            settings.resolve_relative_to(base);
        }
        settings.validate()?;
        Ok(settings)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.folder);
        resolve(&mut self.manifest);
        resolve(&mut self.exchange_dir);
        if let Some(p) = self.envelope.public_key.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.envelope.private_key.as_mut() {
            resolve(p);
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.envelope
            .config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.envelope.mode == EnvelopeMode::PublicKey
            && self.envelope.public_key.is_none()
            && self.envelope.private_key.is_none()
        {
            return Err(ConfigError::Invalid(
                "public-key mode needs public_key and/or private_key".to_string(),
            ));
        }
        if self.exchange_dir.starts_with(&self.folder) {
            return Err(ConfigError::Invalid(
                "exchange_dir must not be inside folder".to_string(),
            ));
        }
        if self.manifest.starts_with(&self.folder) {
            return Err(ConfigError::Invalid(
                "manifest must not be inside folder".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read settings file.
    #[error("failed to read settings file {path}: {source}")]
    ReadError {
        /// Path to the settings file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse settings file.
    #[error("failed to parse settings file {path}: {source}")]
    ParseError {
        /// Path to the settings file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Settings parsed but are inconsistent.
    #[error("invalid settings: {0}")]
    Invalid(String),
}
