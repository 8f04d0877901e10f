//! RSA key pairs for public-key mode.
//!
//! Private keys are stored as unencrypted PKCS#8 PEM (owner-only permissions
//! on Unix); public keys as SubjectPublicKeyInfo PEM.

use std::path::Path;

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::ContentError;

/// Default modulus size for generated keys.
pub const RSA_KEY_BITS: usize = 4096;

/// Generate a fresh key pair (public exponent 65537).
pub fn generate_keypair(bits: usize) -> Result<(RsaPrivateKey, RsaPublicKey), ContentError> {
    let mut rng = rand::rngs::OsRng;
    let private = RsaPrivateKey::new(&mut rng, bits).map_err(|e| ContentError::Key(e.to_string()))?;
    let public = RsaPublicKey::from(&private);
    Ok((private, public))
}

/// Write a key pair as PEM files.
pub fn write_keypair(
    private: &RsaPrivateKey,
    public: &RsaPublicKey,
    private_path: &Path,
    public_path: &Path,
) -> Result<(), ContentError> {
    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| ContentError::Key(e.to_string()))?;
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| ContentError::Key(e.to_string()))?;

    write_pem(private_path, private_pem.as_bytes(), true)?;
    write_pem(public_path, public_pem.as_bytes(), false)?;
    Ok(())
}

fn write_pem(path: &Path, contents: &[u8], secret: bool) -> Result<(), ContentError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ContentError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| ContentError::io(path, e))?;
    if secret {
        set_permissions_0600(path)?;
    }
    Ok(())
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
fn set_permissions_0600(path: &Path) -> Result<(), ContentError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| ContentError::io(path, e))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Load a SubjectPublicKeyInfo PEM public key.
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, ContentError> {
    let pem = std::fs::read_to_string(path).map_err(|e| ContentError::io(path, e))?;
    RsaPublicKey::from_public_key_pem(&pem)
        .map_err(|e| ContentError::Key(format!("{}: {e}", path.display())))
}

/// Load an unencrypted PKCS#8 PEM private key.
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey, ContentError> {
    let pem = std::fs::read_to_string(path).map_err(|e| ContentError::io(path, e))?;
    RsaPrivateKey::from_pkcs8_pem(&pem)
        .map_err(|e| ContentError::Key(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn keypair_pem_roundtrip() {
        let dir = tempdir().unwrap();
        let private_path = dir.path().join("keys/private.pem");
        let public_path = dir.path().join("keys/public.pem");

        let (private, public) = generate_keypair(1024).unwrap();
        write_keypair(&private, &public, &private_path, &public_path).unwrap();

        assert_eq!(load_private_key(&private_path).unwrap(), private);
        assert_eq!(load_public_key(&public_path).unwrap(), public);

        let pem = std::fs::read_to_string(&public_path).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[cfg(unix)]
    #[test]
    fn private_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let private_path = dir.path().join("private.pem");
        let public_path = dir.path().join("public.pem");

        let (private, public) = generate_keypair(1024).unwrap();
        write_keypair(&private, &public, &private_path, &public_path).unwrap();

        let mode = std::fs::metadata(&private_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "private key should be 0600");
    }

    #[test]
    fn load_missing_key_is_not_found() {
        let dir = tempdir().unwrap();
        let result = load_public_key(&dir.path().join("absent.pem"));
        assert!(matches!(result, Err(ContentError::NotFound { .. })));
    }

    #[test]
    fn load_garbage_key_is_key_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.pem");
        std::fs::write(&path, "not a key").unwrap();
        assert!(matches!(load_private_key(&path), Err(ContentError::Key(_))));
    }
}
