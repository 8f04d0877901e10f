//! Envelope wire formats.
//!
//! Public-key mode (lengths big-endian):
//!
//! ```text
//! [4]  wrapped_len (N)
//! [N]  RSA-OAEP(key || iv)
//! [..] ciphertext            (same length as the plaintext)
//! [32] HMAC-SHA256(key, ciphertext)
//! ```
//!
//! Password mode:
//!
//! ```text
//! [16] salt
//! [16] iv
//! [..] ciphertext
//! [32] HMAC-SHA256(mac_key, salt || iv || ciphertext)
//! ```
//!
//! Parsing only checks layout. Tag verification and decryption belong to the
//! codecs, which must verify before decrypting.

use crate::encrypt::{IV_SIZE, KEY_SIZE, SALT_SIZE, TAG_SIZE};
use crate::error::ContentError;

/// Size of the big-endian wrapped-key length prefix.
const LEN_PREFIX_SIZE: usize = 4;

/// Smallest acceptable wrapped blob: it can never be shorter than the
/// `key || iv` it protects.
pub const MIN_WRAPPED_LEN: usize = KEY_SIZE + IV_SIZE;

/// Smallest valid public-key envelope (empty plaintext).
pub const MIN_SEALED_LEN: usize = LEN_PREFIX_SIZE + MIN_WRAPPED_LEN + TAG_SIZE;

/// Smallest valid password envelope (empty plaintext).
pub const MIN_PASSWORD_LEN: usize = SALT_SIZE + IV_SIZE + TAG_SIZE;

/// Parsed public-key envelope borrowing from the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope<'a> {
    /// RSA-OAEP encrypted `key || iv`.
    pub wrapped_key: &'a [u8],
    /// AES-256-CFB ciphertext.
    pub ciphertext: &'a [u8],
    /// HMAC-SHA256 tag over the ciphertext.
    pub tag: &'a [u8],
}

impl<'a> SealedEnvelope<'a> {
    /// Split raw bytes into their fields.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ContentError> {
        if bytes.len() < MIN_SEALED_LEN {
            return Err(ContentError::malformed(format!(
                "envelope too short: {} bytes (min {})",
                bytes.len(),
                MIN_SEALED_LEN
            )));
        }

        let (prefix, rest) = bytes.split_at(LEN_PREFIX_SIZE);
        let mut len_bytes = [0u8; LEN_PREFIX_SIZE];
        len_bytes.copy_from_slice(prefix);
        let wrapped_len = u32::from_be_bytes(len_bytes) as usize;

        if wrapped_len < MIN_WRAPPED_LEN {
            return Err(ContentError::malformed(format!(
                "wrapped key too short: {wrapped_len} bytes (min {MIN_WRAPPED_LEN})"
            )));
        }
        if wrapped_len > rest.len() - TAG_SIZE {
            return Err(ContentError::malformed(format!(
                "wrapped key length {wrapped_len} exceeds remaining {} bytes",
                rest.len() - TAG_SIZE
            )));
        }

        let (wrapped_key, rest) = rest.split_at(wrapped_len);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);
        Ok(Self {
            wrapped_key,
            ciphertext,
            tag,
        })
    }

    /// Serialize to the wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ContentError> {
        let wrapped_len = u32::try_from(self.wrapped_key.len())
            .map_err(|_| ContentError::EncryptionFailed("wrapped key too large".into()))?;
        let mut out = Vec::with_capacity(
            LEN_PREFIX_SIZE + self.wrapped_key.len() + self.ciphertext.len() + self.tag.len(),
        );
        out.extend_from_slice(&wrapped_len.to_be_bytes());
        out.extend_from_slice(self.wrapped_key);
        out.extend_from_slice(self.ciphertext);
        out.extend_from_slice(self.tag);
        Ok(out)
    }
}

/// Parsed password envelope borrowing from the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordEnvelope<'a> {
    /// PBKDF2 salt.
    pub salt: &'a [u8; SALT_SIZE],
    /// CFB initialization vector.
    pub iv: &'a [u8; IV_SIZE],
    /// AES-256-CFB ciphertext.
    pub ciphertext: &'a [u8],
    /// HMAC-SHA256 tag over `salt || iv || ciphertext`.
    pub tag: &'a [u8],
}

impl<'a> PasswordEnvelope<'a> {
    /// Split raw bytes into their fields.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ContentError> {
        if bytes.len() < MIN_PASSWORD_LEN {
            return Err(ContentError::malformed(format!(
                "envelope too short: {} bytes (min {})",
                bytes.len(),
                MIN_PASSWORD_LEN
            )));
        }

        let (salt, rest) = bytes.split_at(SALT_SIZE);
        let (iv, rest) = rest.split_at(IV_SIZE);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);
        Ok(Self {
            salt: salt
                .try_into()
                .map_err(|_| ContentError::malformed("salt"))?,
            iv: iv.try_into().map_err(|_| ContentError::malformed("iv"))?,
            ciphertext,
            tag,
        })
    }

    /// Serialize to the wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(SALT_SIZE + IV_SIZE + self.ciphertext.len() + self.tag.len());
        out.extend_from_slice(self.salt);
        out.extend_from_slice(self.iv);
        out.extend_from_slice(self.ciphertext);
        out.extend_from_slice(self.tag);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed_bytes(wrapped_len: usize, body_len: usize) -> Vec<u8> {
        let mut out = (wrapped_len as u32).to_be_bytes().to_vec();
        out.extend(std::iter::repeat(0xAA).take(wrapped_len));
        out.extend(std::iter::repeat(0xBB).take(body_len));
        out.extend(std::iter::repeat(0xCC).take(TAG_SIZE));
        out
    }

    #[test]
    fn sealed_parse_splits_fields() {
        let bytes = sealed_bytes(64, 10);
        let env = SealedEnvelope::parse(&bytes).unwrap();
        assert_eq!(env.wrapped_key, &[0xAA; 64][..]);
        assert_eq!(env.ciphertext, &[0xBB; 10][..]);
        assert_eq!(env.tag, &[0xCC; TAG_SIZE][..]);
        assert_eq!(env.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn sealed_accepts_empty_ciphertext() {
        let bytes = sealed_bytes(MIN_WRAPPED_LEN, 0);
        assert_eq!(bytes.len(), MIN_SEALED_LEN);
        assert!(SealedEnvelope::parse(&bytes).unwrap().ciphertext.is_empty());
    }

    #[test]
    fn sealed_rejects_truncated_header() {
        assert!(matches!(
            SealedEnvelope::parse(&[0, 0, 1]),
            Err(ContentError::Malformed { .. })
        ));
        assert!(SealedEnvelope::parse(&[]).is_err());
    }

    #[test]
    fn sealed_rejects_length_beyond_buffer() {
        let mut bytes = sealed_bytes(64, 0);
        bytes[..4].copy_from_slice(&1000u32.to_be_bytes());
        assert!(matches!(
            SealedEnvelope::parse(&bytes),
            Err(ContentError::Malformed { .. })
        ));
    }

    #[test]
    fn sealed_rejects_length_eating_the_tag() {
        // Wrapped length claims the tag bytes as well.
        let mut bytes = sealed_bytes(64, 0);
        bytes[..4].copy_from_slice(&(64u32 + 1).to_be_bytes());
        assert!(SealedEnvelope::parse(&bytes).is_err());
    }

    #[test]
    fn sealed_rejects_tiny_wrapped_key() {
        let bytes = sealed_bytes(8, 100);
        assert!(matches!(
            SealedEnvelope::parse(&bytes),
            Err(ContentError::Malformed { .. })
        ));
    }

    #[test]
    fn password_parse_splits_fields() {
        let mut bytes = vec![1u8; SALT_SIZE];
        bytes.extend([2u8; IV_SIZE]);
        bytes.extend(b"cipher");
        bytes.extend([3u8; TAG_SIZE]);

        let env = PasswordEnvelope::parse(&bytes).unwrap();
        assert_eq!(env.salt, &[1u8; SALT_SIZE]);
        assert_eq!(env.iv, &[2u8; IV_SIZE]);
        assert_eq!(env.ciphertext, b"cipher");
        assert_eq!(env.to_bytes(), bytes);
    }

    #[test]
    fn password_rejects_short_input() {
        let bytes = vec![0u8; MIN_PASSWORD_LEN - 1];
        assert!(matches!(
            PasswordEnvelope::parse(&bytes),
            Err(ContentError::Malformed { .. })
        ));
        assert!(PasswordEnvelope::parse(&vec![0u8; MIN_PASSWORD_LEN]).is_ok());
    }
}
