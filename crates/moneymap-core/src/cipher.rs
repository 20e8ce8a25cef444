//! # Field Cipher
//!
//! Symmetric encryption for individual financial fields.
//!
//! Each value is sealed independently with AES-256-GCM under one process-wide
//! key. A sealed blob is laid out as:
//!
//! ```text
//! ┌─────────┬──────────────┬────────────────────────────┐
//! │ version │ nonce (12 B) │ ciphertext ‖ tag (16 B)    │
//! └─────────┴──────────────┴────────────────────────────┘
//! ```
//!
//! The version byte is also bound as associated data. There is no key
//! rotation: a blob sealed under another key fails to open with
//! [`CipherError::Decrypt`], and callers decide whether that skips a row or
//! blanks a field.

use crate::money::{Money, MoneyError};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;
use thiserror::Error;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// Current sealed-blob format.
const SEAL_VERSION: u8 = 1;

/// Errors from sealing or opening a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("encryption key must be {KEY_LEN} bytes, got {0}")]
    KeyLength(usize),

    #[error("encryption key is not valid base64")]
    KeyEncoding,

    #[error("sealed value is truncated")]
    Truncated,

    #[error("unsupported sealed value version {0}")]
    Version(u8),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed (wrong key or tampered value)")]
    Decrypt,

    #[error("system random source failed")]
    Random,

    #[error("decrypted value is not UTF-8")]
    Utf8,

    #[error("decrypted value is not an amount: {0}")]
    Amount(#[from] MoneyError),
}

/// Seals and opens individual field values.
pub struct FieldCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Build a cipher from raw key bytes.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_LEN {
            return Err(CipherError::KeyLength(key.len()));
        }
        let unbound =
            UnboundKey::new(&AES_256_GCM, key).map_err(|_| CipherError::KeyLength(key.len()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Build a cipher from a base64 key, as printed by [`generate_key`].
    ///
    /// URL-safe and standard alphabets are accepted, padded or not.
    pub fn from_base64(encoded: &str) -> Result<Self, CipherError> {
        let key = decode_key(encoded)?;
        Self::new(&key)
    }

    /// Encrypt a plaintext value into a sealed blob.
    pub fn seal(&self, plaintext: &str) -> Result<Vec<u8>, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CipherError::Random)?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from([SEAL_VERSION]),
                &mut in_out,
            )
            .map_err(|_| CipherError::Encrypt)?;

        let mut sealed = Vec::with_capacity(1 + NONCE_LEN + in_out.len());
        sealed.push(SEAL_VERSION);
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(sealed)
    }

    /// Decrypt a sealed blob back to its plaintext.
    pub fn open(&self, sealed: &[u8]) -> Result<String, CipherError> {
        let (&version, rest) = sealed.split_first().ok_or(CipherError::Truncated)?;
        if version != SEAL_VERSION {
            return Err(CipherError::Version(version));
        }
        if rest.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CipherError::Truncated);
        }

        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CipherError::Truncated)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from([version]), &mut in_out)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| CipherError::Utf8)
    }

    /// Seal an amount.
    pub fn seal_money(&self, amount: Money) -> Result<Vec<u8>, CipherError> {
        self.seal(&amount.to_string())
    }

    /// Open a sealed amount.
    pub fn open_money(&self, sealed: &[u8]) -> Result<Money, CipherError> {
        let text = self.open(sealed)?;
        Ok(Money::parse(&text)?)
    }
}

/// Generate a fresh random key, URL-safe base64 encoded.
pub fn generate_key() -> Result<String, CipherError> {
    let mut key = [0u8; KEY_LEN];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| CipherError::Random)?;
    Ok(URL_SAFE.encode(key))
}

fn decode_key(encoded: &str) -> Result<Vec<u8>, CipherError> {
    let encoded = encoded.trim();
    [&URL_SAFE, &URL_SAFE_NO_PAD, &STANDARD, &STANDARD_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(encoded).ok())
        .ok_or(CipherError::KeyEncoding)
}

// =============================================================================
// TESTS
// =============================================================================
