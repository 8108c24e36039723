//! Signed, time-limited anti-forgery state tokens.
//!
//! The serving layer is stateless and horizontally scaled: an
//! authorization redirect may return to a different instance than the
//! one that issued it, so session-stored CSRF tokens are insufficient.
//! A keyed signature lets any instance validate the callback with
//! nothing but the shared process secret; the TTL bounds the replay
//! window.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use ledgermark_domain::StateToken;
use rand::RngCore;
use ring::hmac;
use thiserror::Error;

/// Default validity window for a state token, in seconds.
pub const STATE_TOKEN_TTL_SECS: i64 = 600;

/// Length of the random nonce in bytes.
const NONCE_LEN: usize = 16;

/// Why a state token was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateTokenError {
    /// The signature did not recompute: tampered or forged token.
    #[error("state token signature mismatch")]
    BadSignature,

    /// The token's TTL elapsed: replay of a stale token.
    #[error("state token expired")]
    Expired,

    /// The raw string does not have the token wire shape.
    #[error("malformed state token")]
    Malformed,
}

/// Issues and validates signed state tokens.
///
/// Owns the process-wide signing key, which is read-only after
/// construction; rotating the secret requires a process restart and
/// implicitly invalidates all outstanding tokens (acceptable, their
/// TTL is short). No other state is held.
pub struct StateTokenCodec {
    key: hmac::Key,
    ttl_secs: i64,
}

impl StateTokenCodec {
    /// Create a codec over the process signing secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            ttl_secs: STATE_TOKEN_TTL_SECS,
        }
    }

    /// Override the validity window.
    #[must_use]
    pub const fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Issue a token stamped at `now` with a fresh random nonce.
    #[must_use]
    pub fn issue(&self, now: DateTime<Utc>) -> StateToken {
        let mut bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut bytes);
        let nonce = URL_SAFE_NO_PAD.encode(bytes);
        let issued_at = now.timestamp();

        let tag = hmac::sign(
            &self.key,
            StateToken::signing_input(&nonce, issued_at).as_bytes(),
        );
        StateToken {
            nonce,
            issued_at,
            signature: URL_SAFE_NO_PAD.encode(tag.as_ref()),
        }
    }

    /// Validate a token against the signing key and the TTL at `now`.
    ///
    /// The signature comparison is constant-time (`ring::hmac::verify`),
    /// so rejection latency reveals nothing about the expected digest.
    ///
    /// # Errors
    /// [`StateTokenError::BadSignature`] when the signature does not
    /// recompute, [`StateTokenError::Expired`] when the TTL elapsed,
    /// [`StateTokenError::Malformed`] when the signature is not valid
    /// base64.
    pub fn validate(
        &self,
        token: &StateToken,
        now: DateTime<Utc>,
    ) -> Result<(), StateTokenError> {
        let signature = URL_SAFE_NO_PAD
            .decode(&token.signature)
            .map_err(|_| StateTokenError::Malformed)?;

        hmac::verify(
            &self.key,
            StateToken::signing_input(&token.nonce, token.issued_at).as_bytes(),
            &signature,
        )
        .map_err(|_| StateTokenError::BadSignature)?;

        // Only trust the embedded timestamp once the signature holds.
        let age = now.timestamp() - token.issued_at;
        if age > self.ttl_secs || age < 0 {
            return Err(StateTokenError::Expired);
        }
        Ok(())
    }

    /// Parse a wire-form string and validate it in one step.
    ///
    /// # Errors
    /// [`StateTokenError::Malformed`] when parsing fails, otherwise as
    /// [`Self::validate`].
    pub fn validate_str(&self, raw: &str, now: DateTime<Utc>) -> Result<(), StateTokenError> {
        let token = StateToken::parse(raw).map_err(|_| StateTokenError::Malformed)?;
        self.validate(&token, now)
    }
}

impl std::fmt::Debug for StateTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The key must never leak through Debug output.
        f.debug_struct("StateTokenCodec")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn codec() -> StateTokenCodec {
        StateTokenCodec::new(b"test-signing-secret")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn test_validate_accepts_fresh_token() {
        let codec = codec();
        let token = codec.issue(at(0));
        assert_eq!(codec.validate(&token, at(0)), Ok(()));
        assert_eq!(codec.validate(&token, at(STATE_TOKEN_TTL_SECS)), Ok(()));
    }

    #[test]
    fn test_validate_rejects_after_ttl() {
        let codec = codec();
        let token = codec.issue(at(0));
        assert_eq!(
            codec.validate(&token, at(STATE_TOKEN_TTL_SECS + 1)),
            Err(StateTokenError::Expired)
        );
    }

    #[test]
    fn test_validate_rejects_tampered_nonce() {
        let codec = codec();
        let mut token = codec.issue(at(0));
        token.nonce = "AAAAAAAAAAAAAAAAAAAAAA".to_string();
        assert_eq!(
            codec.validate(&token, at(0)),
            Err(StateTokenError::BadSignature)
        );
    }

    #[test]
    fn test_validate_rejects_tampered_timestamp() {
        let codec = codec();
        // Backdating the timestamp must fail on the signature, not the
        // TTL: the embedded time is untrusted until the digest holds.
        let mut token = codec.issue(at(STATE_TOKEN_TTL_SECS * 10));
        token.issued_at = at(STATE_TOKEN_TTL_SECS * 10).timestamp() - 1;
        assert_eq!(
            codec.validate(&token, at(STATE_TOKEN_TTL_SECS * 10)),
            Err(StateTokenError::BadSignature)
        );
    }

    #[test]
    fn test_validate_rejects_foreign_key() {
        let token = codec().issue(at(0));
        let other = StateTokenCodec::new(b"a-different-secret");
        assert_eq!(
            other.validate(&token, at(0)),
            Err(StateTokenError::BadSignature)
        );
    }

    #[test]
    fn test_validate_str_round_trip() {
        let codec = codec();
        let raw = codec.issue(at(0)).encode();
        assert_eq!(codec.validate_str(&raw, at(0)), Ok(()));
        assert_eq!(
            codec.validate_str("garbage", at(0)),
            Err(StateTokenError::Malformed)
        );
    }

    #[test]
    fn test_nonces_are_unique() {
        let codec = codec();
        let a = codec.issue(at(0));
        let b = codec.issue(at(0));
        assert_ne!(a.nonce, b.nonce);
    }
}
