//! Generate an RSA key pair for public-key mode.

use anyhow::{Context, Result};
use std::path::Path;
use sync_content::{generate_keypair, write_keypair};

/// Run the keygen command.
pub async fn run(private_path: &Path, public_path: &Path, bits: usize) -> Result<()> {
    if private_path.exists() {
        anyhow::bail!(
            "Private key already exists: {} (remove it first)",
            private_path.display()
        );
    }

    println!("Generating {bits}-bit RSA key pair...");
    let (private, public) = tokio::task::spawn_blocking(move || generate_keypair(bits))
        .await
        .context("Key generation task failed")?
        .context("Failed to generate key pair")?;

    write_keypair(&private, &public, private_path, public_path)
        .context("Failed to write key pair")?;

    println!();
    println!("  Private key: {}", private_path.display());
    println!("  Public key:  {}", public_path.display());
    println!();
    println!("Give the public key to the other side; keep the private key here.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_content::{load_private_key, load_public_key};
    use tempfile::tempdir;

    #[tokio::test]
    async fn keygen_writes_loadable_pair() {
        let dir = tempdir().unwrap();
        let private_path = dir.path().join("keys/me.pem");
        let public_path = dir.path().join("keys/me.pub.pem");

        run(&private_path, &public_path, 1024).await.unwrap();

        let private = load_private_key(&private_path).unwrap();
        let public = load_public_key(&public_path).unwrap();
        assert_eq!(sync_content::RsaPublicKey::from(&private), public);
    }

    #[tokio::test]
    async fn keygen_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let private_path = dir.path().join("me.pem");
        std::fs::write(&private_path, "existing").unwrap();

        let result = run(&private_path, &dir.path().join("me.pub.pem"), 1024).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&private_path).unwrap(), "existing");
    }
}
