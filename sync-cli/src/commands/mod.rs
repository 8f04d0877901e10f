//! CLI command implementations.

pub mod init;
pub mod keygen;
pub mod pull;
pub mod push;
pub mod status;

use anyhow::{Context, Result};
use std::sync::Arc;
use sync_client::{GitTransport, LocalTransport, SessionConfig, SyncSession, Transport};
use sync_content::{
    load_private_key, load_public_key, EnvelopeCodec, EnvelopeMode, PasswordCodec, PlainCodec,
    PublicKeyCodec,
};

use crate::config::{EnvelopeSettings, Settings};

/// Session over whichever transport the settings select.
pub type Session = SyncSession<Box<dyn Transport>>;

/// Build a session from loaded settings.
pub fn open_session(settings: &Settings) -> Result<Session> {
    let config = SessionConfig {
        side: settings.side,
        folder: settings.folder.clone(),
        manifest_path: settings.manifest.clone(),
    };
    let codec = build_codec(&settings.envelope)?;
    Ok(SyncSession::new(config, build_transport(settings)?, codec))
}

/// Git transport when `[git]` is present, shared folder otherwise.
pub fn build_transport(settings: &Settings) -> Result<Box<dyn Transport>> {
    let Some(git) = &settings.git else {
        return Ok(Box::new(LocalTransport::new(&settings.exchange_dir)));
    };

    let mut transport = GitTransport::new(&settings.exchange_dir, &git.branch)
        .with_commit_prefix(&git.commit_prefix);
    if let Some(remote) = &git.remote {
        transport = transport.with_remote(remote);
    }
    if let Some(var) = &git.token_env {
        let token = std::env::var(var)
            .with_context(|| format!("git token variable {var} is not set"))?;
        transport = transport.with_token(token);
    }
    Ok(Box::new(transport))
}

/// Build the envelope codec for the configured mode.
///
/// Public-key mode loads whichever keys are configured; a side that only
/// pushes needs just the peer's public key.
pub fn build_codec(envelope: &EnvelopeSettings) -> Result<Arc<dyn EnvelopeCodec>> {
    match envelope.mode {
        EnvelopeMode::Plain => Ok(Arc::new(PlainCodec)),
        EnvelopeMode::PublicKey => {
            let public = envelope
                .public_key
                .as_deref()
                .map(|path| {
                    load_public_key(path)
                        .with_context(|| format!("Failed to load public key {}", path.display()))
                })
                .transpose()?;
            let private = envelope
                .private_key
                .as_deref()
                .map(|path| {
                    load_private_key(path)
                        .with_context(|| format!("Failed to load private key {}", path.display()))
                })
                .transpose()?;
            Ok(Arc::new(PublicKeyCodec::new(public, private)))
        }
        EnvelopeMode::Password => {
            let password = read_password(&envelope.password_env)?;
            if password.is_empty() {
                anyhow::bail!("Password must not be empty");
            }
            Ok(Arc::new(PasswordCodec::new(&password, &envelope.config())))
        }
    }
}

/// Password from `var`, or an interactive prompt when it is unset.
fn read_password(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(password) => Ok(password),
        Err(_) => rpassword::prompt_password("Sync password: ").context("Failed to read password"),
    }
}

/// Format a unix timestamp as a coarse age ("3m ago").
pub fn format_age(then: f64, now: f64) -> String {
    let secs = (now - then).max(0.0) as u64;
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;
    use sync_content::{generate_keypair, write_keypair};
    use sync_types::Side;

    /// Plain-mode settings over a folder and a shared exchange dir.
    pub(crate) fn plain_settings(root: &Path, side: Side) -> Settings {
        let toml = format!(
            r#"
side = {side}
folder = "{root}/folder-{side}"
manifest = "{root}/state/manifest-{side}.json"
exchange_dir = "{root}/exchange"

[envelope]
mode = "plain"
"#,
            side = side.number(),
            root = root.display(),
        );
        let settings: Settings = toml::from_str(&toml).unwrap();
        std::fs::create_dir_all(&settings.folder).unwrap();
        settings
    }

    #[test]
    fn format_age_units() {
        assert_eq!(format_age(100.0, 130.0), "30s ago");
        assert_eq!(format_age(0.0, 600.0), "10m ago");
        assert_eq!(format_age(0.0, 7200.0), "2h ago");
        assert_eq!(format_age(0.0, 3.0 * 86_400.0), "3d ago");
        assert_eq!(format_age(10.0, 5.0), "0s ago");
    }

    #[test]
    fn plain_mode_builds_plain_codec() {
        let codec = build_codec(&EnvelopeSettings {
            mode: EnvelopeMode::Plain,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(codec.mode(), EnvelopeMode::Plain);
    }

    #[test]
    fn public_key_mode_loads_configured_keys() {
        let dir = tempfile::tempdir().unwrap();
        let private_path = dir.path().join("me.pem");
        let public_path = dir.path().join("me.pub.pem");
        let (private, public) = generate_keypair(1024).unwrap();
        write_keypair(&private, &public, &private_path, &public_path).unwrap();

        let codec = build_codec(&EnvelopeSettings {
            public_key: Some(public_path),
            private_key: Some(private_path),
            ..Default::default()
        })
        .unwrap();
        let sealed = codec.seal(b"payload").unwrap();
        assert_eq!(codec.open(&sealed).unwrap(), b"payload");
    }

    #[test]
    fn missing_key_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_codec(&EnvelopeSettings {
            public_key: Some(dir.path().join("absent.pem")),
            ..Default::default()
        });
        let err = result.err().unwrap();
        assert!(err.to_string().contains("Failed to load public key"));
    }

    #[test]
    fn no_git_section_selects_shared_folder() {
        let dir = tempfile::tempdir().unwrap();
        let settings = plain_settings(dir.path(), Side::One);
        let transport = build_transport(&settings).unwrap();
        assert_eq!(transport.exchange_dir(), settings.exchange_dir);
    }
}
