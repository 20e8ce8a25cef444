//! # Password Hashing
//!
//! PBKDF2-HMAC-SHA256 with a per-user random salt. Stored as
//! `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded base64 segments,
//! so the iteration count can change without invalidating old hashes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use ring::digest::SHA256_OUTPUT_LEN;
use ring::pbkdf2::{self, PBKDF2_HMAC_SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;
use thiserror::Error;

/// Scheme tag at the front of every stored hash.
const SCHEME: &str = "pbkdf2-sha256";

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Default work factor.
pub const DEFAULT_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters long")]
    TooShort,

    #[error("system random source failed")]
    Random,
}

/// Hash a password with the default work factor.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

/// Hash a password with an explicit iteration count.
pub fn hash_password_with(password: &str, iterations: NonZeroU32) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| PasswordError::Random)?;

    let mut hash = [0u8; SHA256_OUTPUT_LEN];
    pbkdf2::derive(
        PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Check a password against a stored hash.
///
/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(hash)) else {
        return false;
    };

    pbkdf2::verify(
        PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

/// Enforce the minimum length on a new password.
pub fn validate_new_password(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> NonZeroU32 {
        NonZeroU32::new(1_000).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let stored = hash_password_with("correct horse", fast()).unwrap();
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn salts_are_unique() {
        let a = hash_password_with("same", fast()).unwrap();
        let b = hash_password_with("same", fast()).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        for stored in [
            "",
            "plain-text-password",
            "pbkdf2-sha256$0$AAAA$AAAA",
            "pbkdf2-sha256$abc$AAAA$AAAA",
            "bcrypt$1000$AAAA$AAAA",
            "pbkdf2-sha256$1000$!!!$AAAA",
            "pbkdf2-sha256$1000$AAAA$AAAA$extra",
        ] {
            assert!(!verify_password("anything", stored), "{stored}");
        }
    }

    #[test]
    fn default_iterations_hash_verifies() {
        let stored = hash_password("long enough").unwrap();
        assert!(stored.starts_with("pbkdf2-sha256$100000$"));
        assert!(verify_password("long enough", &stored));
    }

    #[test]
    fn minimum_length() {
        assert_eq!(validate_new_password("short"), Err(PasswordError::TooShort));
        assert!(validate_new_password("12345678").is_ok());
        // Counted in characters, not bytes.
        assert_eq!(validate_new_password("ééééééé"), Err(PasswordError::TooShort));
    }
}
