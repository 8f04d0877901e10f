//! Envelope codecs.
//!
//! One strategy trait, three implementations:
//!
//! - [`PlainCodec`] - pass-through, staged files are byte copies
//! - [`PublicKeyCodec`] - fresh AES key per file, wrapped with RSA-OAEP(SHA-256)
//! - [`PasswordCodec`] - AES and MAC keys derived per file from password + salt
//!
//! The scan/diff/apply engine only ever sees `&dyn EnvelopeCodec`.

use std::fmt;

use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::encrypt::{
    cfb_decrypt, cfb_encrypt, compute_tag, derive_password_keys, random_bytes, verify_tag,
    IV_SIZE, KEY_SIZE, SALT_SIZE,
};
use crate::envelope::{PasswordEnvelope, SealedEnvelope};
use crate::error::ContentError;

/// Minimum PBKDF2 iteration count accepted for real deployments.
pub const MIN_PBKDF2_ITERATIONS: u32 = 200_000;

/// File suffix of staged encrypted envelopes.
pub const ENVELOPE_SUFFIX: &str = ".enc";

/// Key establishment mode, fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeMode {
    /// No encryption; staged files are plain copies.
    Plain,
    /// RSA-wrapped per-file key.
    PublicKey,
    /// PBKDF2-derived keys from a shared password.
    Password,
}

impl fmt::Display for EnvelopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::PublicKey => "public-key",
            Self::Password => "password",
        };
        f.write_str(name)
    }
}

/// Explicit codec configuration handed over at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Selected key establishment mode.
    pub mode: EnvelopeMode,
    /// PBKDF2 iterations (password mode). Both sides must agree.
    pub pbkdf2_iterations: u32,
}

impl EnvelopeConfig {
    /// Configuration for `mode` with the default iteration count.
    pub fn new(mode: EnvelopeMode) -> Self {
        Self {
            mode,
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
        }
    }

    /// Override the PBKDF2 iteration count.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    /// Reject parameters below the deployment minimum.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.mode == EnvelopeMode::Password && self.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            return Err(ContentError::Key(format!(
                "pbkdf2 iterations too low: {} (min {})",
                self.pbkdf2_iterations, MIN_PBKDF2_ITERATIONS
            )));
        }
        Ok(())
    }
}

/// Strategy for turning a file body into its staged form and back.
pub trait EnvelopeCodec: Send + Sync {
    /// Encode plaintext into the staged representation.
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, ContentError>;

    /// Decode a staged representation, verifying integrity first.
    fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, ContentError>;

    /// Suffix appended to the relative path of a staged file.
    fn file_suffix(&self) -> &'static str {
        ENVELOPE_SUFFIX
    }

    /// Mode implemented by this codec.
    fn mode(&self) -> EnvelopeMode;

    /// Whether `open` can succeed at all with the material this codec holds.
    fn can_open(&self) -> bool {
        true
    }
}

/// Pass-through codec for unencrypted deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl EnvelopeCodec for PlainCodec {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, ContentError> {
        Ok(plaintext.to_vec())
    }

    fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, ContentError> {
        Ok(envelope.to_vec())
    }

    fn file_suffix(&self) -> &'static str {
        ""
    }

    fn mode(&self) -> EnvelopeMode {
        EnvelopeMode::Plain
    }
}

/// Public-key codec.
///
/// The sender needs the receiver's public key; the receiver needs its
/// private key. Either may be absent on a side that only does one direction.
pub struct PublicKeyCodec {
    public: Option<RsaPublicKey>,
    private: Option<RsaPrivateKey>,
}

impl PublicKeyCodec {
    /// Create a codec from whichever keys this side holds.
    pub fn new(public: Option<RsaPublicKey>, private: Option<RsaPrivateKey>) -> Self {
        Self { public, private }
    }

    fn padding() -> Oaep {
        Oaep::new::<Sha256>()
    }
}

// Don't leak key material in debug output
impl fmt::Debug for PublicKeyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyCodec")
            .field("public", &self.public.is_some())
            .field("private", &"[REDACTED]")
            .finish()
    }
}

impl EnvelopeCodec for PublicKeyCodec {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, ContentError> {
        let public = self.public.as_ref().ok_or(ContentError::MissingKey("public key"))?;

        let key: Zeroizing<[u8; KEY_SIZE]> = Zeroizing::new(random_bytes()?);
        let iv: [u8; IV_SIZE] = random_bytes()?;

        let mut key_and_iv = Zeroizing::new(Vec::with_capacity(KEY_SIZE + IV_SIZE));
        key_and_iv.extend_from_slice(key.as_slice());
        key_and_iv.extend_from_slice(&iv);
        let wrapped_key = public
            .encrypt(&mut rand::rngs::OsRng, Self::padding(), &key_and_iv)
            .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;

        let mut ciphertext = plaintext.to_vec();
        cfb_encrypt(&key, &iv, &mut ciphertext);
        let tag = compute_tag(key.as_slice(), &[&ciphertext])?;

        SealedEnvelope {
            wrapped_key: &wrapped_key,
            ciphertext: &ciphertext,
            tag: &tag,
        }
        .to_bytes()
    }

    fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, ContentError> {
        let private = self
            .private
            .as_ref()
            .ok_or(ContentError::MissingKey("private key"))?;
        let parsed = SealedEnvelope::parse(envelope)?;
        if parsed.wrapped_key.len() != private.size() {
            return Err(ContentError::malformed(format!(
                "wrapped key is {} bytes (expected {} for this private key)",
                parsed.wrapped_key.len(),
                private.size()
            )));
        }

        // A wrapped key we cannot unwrap means a foreign key or tampering.
        let key_and_iv = Zeroizing::new(
            private
                .decrypt(Self::padding(), parsed.wrapped_key)
                .map_err(|_| ContentError::IntegrityCheckFailed)?,
        );
        if key_and_iv.len() != KEY_SIZE + IV_SIZE {
            return Err(ContentError::malformed(format!(
                "unwrapped key material is {} bytes (expected {})",
                key_and_iv.len(),
                KEY_SIZE + IV_SIZE
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        let mut iv = [0u8; IV_SIZE];
        key.copy_from_slice(&key_and_iv[..KEY_SIZE]);
        iv.copy_from_slice(&key_and_iv[KEY_SIZE..]);

        verify_tag(key.as_slice(), &[parsed.ciphertext], parsed.tag)?;

        let mut plaintext = parsed.ciphertext.to_vec();
        cfb_decrypt(&key, &iv, &mut plaintext);
        Ok(plaintext)
    }

    fn mode(&self) -> EnvelopeMode {
        EnvelopeMode::PublicKey
    }

    fn can_open(&self) -> bool {
        self.private.is_some()
    }
}

/// Password codec.
pub struct PasswordCodec {
    password: Zeroizing<Vec<u8>>,
    iterations: u32,
}

impl PasswordCodec {
    /// Create a codec from the shared password and configuration.
    pub fn new(password: &str, config: &EnvelopeConfig) -> Self {
        Self {
            password: Zeroizing::new(password.as_bytes().to_vec()),
            iterations: config.pbkdf2_iterations,
        }
    }
}

// Don't leak secret in debug output
impl fmt::Debug for PasswordCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCodec")
            .field("password", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl EnvelopeCodec for PasswordCodec {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, ContentError> {
        let salt: [u8; SALT_SIZE] = random_bytes()?;
        let iv: [u8; IV_SIZE] = random_bytes()?;
        let keys = derive_password_keys(&self.password, &salt, self.iterations);

        let mut ciphertext = plaintext.to_vec();
        cfb_encrypt(&keys.encryption, &iv, &mut ciphertext);
        let tag = compute_tag(keys.mac.as_slice(), &[&salt, &iv, &ciphertext])?;

        Ok(PasswordEnvelope {
            salt: &salt,
            iv: &iv,
            ciphertext: &ciphertext,
            tag: &tag,
        }
        .to_bytes())
    }

    fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, ContentError> {
        let parsed = PasswordEnvelope::parse(envelope)?;
        let keys = derive_password_keys(&self.password, parsed.salt, self.iterations);

        verify_tag(
            keys.mac.as_slice(),
            &[parsed.salt, parsed.iv, parsed.ciphertext],
            parsed.tag,
        )?;

        let mut plaintext = parsed.ciphertext.to_vec();
        cfb_decrypt(&keys.encryption, parsed.iv, &mut plaintext);
        Ok(plaintext)
    }

    fn mode(&self) -> EnvelopeMode {
        EnvelopeMode::Password
    }
}
