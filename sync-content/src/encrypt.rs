//! Symmetric primitives behind the envelope.
//!
//! This module provides:
//! - AES-256-CFB encryption in place (no padding, output length == input length)
//! - HMAC-SHA256 tags over several concatenated parts
//! - PBKDF2-HMAC-SHA256 derivation of an encryption key and a MAC key
//! - Random key, IV and salt generation

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use aes::Aes256;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::ContentError;

/// Size of the AES-256 content key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the CFB initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// Size of the HMAC-SHA256 tag in bytes.
pub const TAG_SIZE: usize = 32;

/// Size of the password-mode salt in bytes.
pub const SALT_SIZE: usize = 16;

type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Encrypt `data` in place with AES-256-CFB.
pub fn cfb_encrypt(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE], data: &mut [u8]) {
    Aes256CfbEnc::new(GenericArray::from_slice(key), GenericArray::from_slice(iv)).encrypt(data);
}

/// Decrypt `data` in place with AES-256-CFB.
pub fn cfb_decrypt(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE], data: &mut [u8]) {
    Aes256CfbDec::new(GenericArray::from_slice(key), GenericArray::from_slice(iv)).decrypt(data);
}

fn keyed_mac(mac_key: &[u8], parts: &[&[u8]]) -> Result<HmacSha256, ContentError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac)
}

/// HMAC-SHA256 over the concatenation of `parts`.
pub fn compute_tag(mac_key: &[u8], parts: &[&[u8]]) -> Result<[u8; TAG_SIZE], ContentError> {
    let digest = keyed_mac(mac_key, parts)?.finalize().into_bytes();
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&digest);
    Ok(tag)
}

/// Verify `tag` against the HMAC of `parts` in constant time.
///
/// Returns `IntegrityCheckFailed` on mismatch.
pub fn verify_tag(mac_key: &[u8], parts: &[&[u8]], tag: &[u8]) -> Result<(), ContentError> {
    keyed_mac(mac_key, parts)?
        .verify_slice(tag)
        .map_err(|_| ContentError::IntegrityCheckFailed)
}

/// Encryption and MAC keys derived from a password.
pub struct DerivedKeys {
    /// AES-256 key (first half of the PBKDF2 output).
    pub encryption: Zeroizing<[u8; KEY_SIZE]>,
    /// HMAC key (second half of the PBKDF2 output).
    pub mac: Zeroizing<[u8; KEY_SIZE]>,
}

/// Derive 64 bytes with PBKDF2-HMAC-SHA256 and split them into two keys.
pub fn derive_password_keys(password: &[u8], salt: &[u8], iterations: u32) -> DerivedKeys {
    let mut output = Zeroizing::new([0u8; KEY_SIZE * 2]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, output.as_mut_slice());

    let mut encryption = Zeroizing::new([0u8; KEY_SIZE]);
    let mut mac = Zeroizing::new([0u8; KEY_SIZE]);
    encryption.copy_from_slice(&output[..KEY_SIZE]);
    mac.copy_from_slice(&output[KEY_SIZE..]);
    DerivedKeys { encryption, mac }
}

/// Fill a fixed-size array from the OS random source.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], ContentError> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes).map_err(|e| ContentError::EncryptionFailed(e.to_string()))?;
    Ok(bytes)
}
