//! # sync-content
//!
//! Secure envelopes for staged file bodies.
//!
//! Every changed file travels to the peer as one self-describing envelope:
//!
//! ```text
//! Plaintext → AES-256-CFB → Ciphertext → HMAC-SHA256 → Envelope
//!                  ↑                          ↑
//!        key + IV: random per file,     key: same AES key (public-key mode)
//!        RSA-OAEP wrapped               or PBKDF2 MAC key (password mode)
//!        or PBKDF2(password, salt)
//! ```
//!
//! Opening always verifies the tag before decrypting. A mismatch surfaces as
//! [`ContentError::IntegrityCheckFailed`], distinct from a structurally
//! malformed envelope ([`ContentError::Malformed`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dirsync_content::{EnvelopeConfig, EnvelopeMode, PasswordCodec, StagingArea};
//!
//! let config = EnvelopeConfig::new(EnvelopeMode::Password);
//! config.validate()?;
//! let codec = Arc::new(PasswordCodec::new("shared secret", &config));
//!
//! let staging = StagingArea::new("exchange/side-1/files", codec);
//! staging.stage("notes/todo.txt", b"buy milk")?;
//! assert_eq!(staging.open("notes/todo.txt")?, b"buy milk");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod codec;
mod encrypt;
mod envelope;
mod error;
mod keys;
mod store;

pub use codec::{
    EnvelopeCodec, EnvelopeConfig, EnvelopeMode, PasswordCodec, PlainCodec, PublicKeyCodec,
    ENVELOPE_SUFFIX, MIN_PBKDF2_ITERATIONS,
};
pub use encrypt::{IV_SIZE, KEY_SIZE, SALT_SIZE, TAG_SIZE};
pub use envelope::{
    PasswordEnvelope, SealedEnvelope, MIN_PASSWORD_LEN, MIN_SEALED_LEN, MIN_WRAPPED_LEN,
};
pub use error::ContentError;
pub use keys::{
    generate_keypair, load_private_key, load_public_key, write_keypair, RSA_KEY_BITS,
};
pub use store::StagingArea;

pub use rsa::{RsaPrivateKey, RsaPublicKey};
