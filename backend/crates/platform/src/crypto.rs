//! Cryptographic Utilities
//!
//! Random material, base64 helpers, and AES-256-GCM sealing for values that
//! leave the server (the session cookie). Sealing gives confidentiality and
//! integrity in one step: a modified or foreign value fails to open.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{Engine, engine::general_purpose};
use rand::{RngCore, rngs::OsRng};
use std::fmt;
use thiserror::Error;

/// AES-256 key length
pub const KEY_LEN: usize = 32;
/// GCM nonce length
pub const NONCE_LEN: usize = 12;
/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a random 256-bit key
pub fn random_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

/// Encode bytes as base64
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// Sealing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Not base64url, or too short to hold nonce and tag
    #[error("Malformed sealed value")]
    Malformed,

    /// Tag mismatch: tampered, wrong key, or wrong associated data
    #[error("Sealed value failed authentication")]
    Authentication,

    #[error("Encryption failed")]
    Encryption,
}

/// AES-256-GCM key for sealing opaque tokens
///
/// Output format: `base64url(nonce || ciphertext || tag)` without padding,
/// which is safe to place in a cookie value as-is.
#[derive(Clone)]
pub struct SealingKey {
    cipher: Aes256Gcm,
}

impl SealingKey {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Encrypt and authenticate `plaintext`, binding it to `aad`
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<String, CryptoError> {
        let mut sealed = random_bytes(NONCE_LEN);
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&sealed),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::Encryption)?;

        sealed.extend_from_slice(&ciphertext);
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Verify and decrypt a value produced by [`SealingKey::seal`]
    pub fn open(&self, sealed: &str, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|_| CryptoError::Malformed)?;

        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Malformed);
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::Authentication)
    }
}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealingKey").field("key", &"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes() {
        let bytes = random_bytes(32);
        assert_eq!(bytes.len(), 32);
        // Should not be all zeros (statistically)
        assert!(bytes.iter().any(|&b| b != 0));
        assert_ne!(random_key(), random_key());
    }

    #[test]
    fn test_base64_decodes_standard_alphabet() {
        assert_eq!(from_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(to_base64(b"hello"), "aGVsbG8=");
        assert!(from_base64("%%%").is_err());
    }

    #[test]
    fn test_seal_open() {
        let key = SealingKey::new(&[7u8; KEY_LEN]);
        let sealed = key.seal(b"payload", b"cookie").unwrap();

        assert!(!sealed.contains('='));
        assert!(!sealed.contains("payload"));
        assert_eq!(key.open(&sealed, b"cookie").unwrap(), b"payload");
    }

    #[test]
    fn test_seal_uses_fresh_nonce() {
        let key = SealingKey::new(&[7u8; KEY_LEN]);
        assert_ne!(
            key.seal(b"same", b"").unwrap(),
            key.seal(b"same", b"").unwrap()
        );
    }

    #[test]
    fn test_open_rejects_wrong_key_or_aad() {
        let key = SealingKey::new(&[1u8; KEY_LEN]);
        let other = SealingKey::new(&[2u8; KEY_LEN]);
        let sealed = key.seal(b"payload", b"cookie").unwrap();

        assert_eq!(
            other.open(&sealed, b"cookie"),
            Err(CryptoError::Authentication)
        );
        assert_eq!(
            key.open(&sealed, b"other_cookie"),
            Err(CryptoError::Authentication)
        );
    }

    #[test]
    fn test_open_rejects_tampering() {
        let key = SealingKey::new(&[1u8; KEY_LEN]);
        let sealed = key.seal(b"payload", b"").unwrap();

        let mut bytes = general_purpose::URL_SAFE_NO_PAD.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        assert_eq!(key.open(&tampered, b""), Err(CryptoError::Authentication));
    }

    #[test]
    fn test_open_rejects_garbage() {
        let key = SealingKey::new(&[1u8; KEY_LEN]);
        assert_eq!(key.open("", b""), Err(CryptoError::Malformed));
        assert_eq!(key.open("not base64 !", b""), Err(CryptoError::Malformed));
        assert_eq!(key.open("AAAA", b""), Err(CryptoError::Malformed));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SealingKey::new(&[9u8; KEY_LEN]);
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
