//! # Password Reset Tokens
//!
//! A reset token is 32 random bytes, URL-safe base64 without padding, so it
//! can go straight into a link. Only its SHA-256 digest is persisted; the
//! plaintext exists in the outgoing email and nowhere else.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use ring::digest::{SHA256, digest};
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;
use subtle::ConstantTimeEq;

/// Token entropy in bytes.
const TOKEN_BYTES: usize = 32;

/// How long a token stays valid after issue, in seconds.
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// A freshly issued reset token.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetToken(String);

impl fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResetToken(..)")
    }
}

impl ResetToken {
    /// Draw a new token from the system random source.
    pub fn generate() -> Option<Self> {
        let mut bytes = [0u8; TOKEN_BYTES];
        SystemRandom::new().fill(&mut bytes).ok()?;
        Some(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// The token text, as it goes into the reset link.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest under which the token is stored.
    #[must_use]
    pub fn digest(&self) -> String {
        token_digest(&self.0)
    }
}

/// Hex SHA-256 of a token string.
#[must_use]
pub fn token_digest(token: &str) -> String {
    hex::encode(digest(&SHA256, token.as_bytes()))
}

/// Constant-time equality of two digests.
#[must_use]
pub fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Expiry of a token issued at `issued_at`.
#[must_use]
pub fn expiry_for(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + TimeDelta::seconds(RESET_TOKEN_TTL_SECS)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = ResetToken::generate().unwrap();
        let b = ResetToken::generate().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert!(
            a.as_str()
                .bytes()
                .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        );
    }

    #[test]
    fn digest_is_stable_hex() {
        let token = ResetToken::generate().unwrap();
        let digest = token.digest();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, token_digest(token.as_str()));
        assert!(digests_match(&digest, &token_digest(token.as_str())));
        assert!(!digests_match(&digest, &token_digest("other")));
    }

    #[test]
    fn debug_hides_token() {
        let token = ResetToken::generate().unwrap();
        assert_eq!(format!("{token:?}"), "ResetToken(..)");
    }

    #[test]
    fn expiry_is_one_hour() {
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(expiry_for(issued).timestamp(), 1_700_003_600);
    }
}
