//! Anti-forgery state token for redirect-based authorization.

use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

/// A self-verifying anti-forgery proof for an authorization attempt.
///
/// The token travels as the `state` query parameter of the redirect
/// flow. Because it carries its own signature, any server instance can
/// validate the callback without shared session state. The signed path
/// is not single-use: a token verifies anywhere until its TTL elapses,
/// so the embedded timestamp is what bounds replay. Single-use holds
/// only on the session-nonce path, where the issuing instance clears
/// the nonce after one callback.
///
/// Wire form: `{nonce}.{issued_at}.{signature}` where `nonce` and
/// `signature` are URL-safe base64 and `issued_at` is unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateToken {
    /// Random unique identifier for this authorization attempt.
    pub nonce: String,
    /// Unix timestamp (seconds) at which the token was issued.
    pub issued_at: i64,
    /// Keyed digest over `(nonce, issued_at)`, URL-safe base64.
    pub signature: String,
}

impl StateToken {
    /// The message covered by the signature.
    #[must_use]
    pub fn signing_input(nonce: &str, issued_at: i64) -> String {
        format!("{nonce}.{issued_at}")
    }

    /// Render the token in its wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}.{}.{}", self.nonce, self.issued_at, self.signature)
    }

    /// Parse a token from its wire form.
    ///
    /// # Errors
    /// Returns [`DomainError::MalformedStateToken`] when the string does
    /// not split into three non-empty parts with a numeric timestamp.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let mut parts = raw.splitn(3, '.');
        let (Some(nonce), Some(ts), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(DomainError::MalformedStateToken);
        };
        if nonce.is_empty() || signature.is_empty() {
            return Err(DomainError::MalformedStateToken);
        }
        let issued_at: i64 = ts
            .parse()
            .map_err(|_| DomainError::MalformedStateToken)?;
        Ok(Self {
            nonce: nonce.to_string(),
            issued_at,
            signature: signature.to_string(),
        })
    }
}

impl std::fmt::Display for StateToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_parse_round_trip() {
        let token = StateToken {
            nonce: "YWJjZGVm".to_string(),
            issued_at: 1_750_000_000,
            signature: "c2lnbmF0dXJl".to_string(),
        };
        let parsed = StateToken::parse(&token.encode()).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert_eq!(
            StateToken::parse("only-one-part"),
            Err(DomainError::MalformedStateToken)
        );
        assert_eq!(
            StateToken::parse("two.parts"),
            Err(DomainError::MalformedStateToken)
        );
    }

    #[test]
    fn test_parse_rejects_non_numeric_timestamp() {
        assert_eq!(
            StateToken::parse("nonce.notanumber.sig"),
            Err(DomainError::MalformedStateToken)
        );
    }

    #[test]
    fn test_parse_rejects_empty_fields() {
        assert_eq!(
            StateToken::parse(".123.sig"),
            Err(DomainError::MalformedStateToken)
        );
        assert_eq!(
            StateToken::parse("nonce.123."),
            Err(DomainError::MalformedStateToken)
        );
    }
}
