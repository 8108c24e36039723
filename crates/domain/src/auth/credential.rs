//! Access credential held for one user session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seconds of remaining lifetime below which a credential should be
/// renewed proactively instead of being handed out.
pub const RENEWAL_BUFFER_SECS: i64 = 300;

/// A single identity claim value as returned by the identity provider.
///
/// Providers return an open map of claims; values are either a single
/// string (subject, email) or a list of strings (group memberships).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    /// A single string value.
    Single(String),
    /// A list of string values.
    Many(Vec<String>),
}

impl ClaimValue {
    /// The value as a single string, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(s) => Some(s),
            Self::Many(_) => None,
        }
    }

    /// The value as a list; a single value is viewed as a one-element list.
    #[must_use]
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// The access grant currently held for one user session.
///
/// Created on a successful authorization-code or device-code exchange,
/// replaced in place on silent renewal, destroyed on sign-out. The raw
/// `access_token` must never appear in logs or user-facing output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque bearer value presented to the ledger system.
    pub access_token: String,
    /// Permission strings granted with this credential.
    pub granted_scopes: Vec<String>,
    /// When the credential was obtained.
    pub acquired_at: DateTime<Utc>,
    /// Lifetime in seconds from `acquired_at`.
    pub expires_in_secs: i64,
    /// Refresh context for silent renewal, when the provider issued one.
    pub refresh_token: Option<String>,
    /// Open claim map from the identity provider.
    #[serde(default)]
    pub identity_claims: BTreeMap<String, ClaimValue>,
}

impl Credential {
    /// Create a credential acquired at `now`.
    #[must_use]
    pub const fn new(
        access_token: String,
        granted_scopes: Vec<String>,
        expires_in_secs: i64,
        refresh_token: Option<String>,
        identity_claims: BTreeMap<String, ClaimValue>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            granted_scopes,
            acquired_at: now,
            expires_in_secs,
            refresh_token,
            identity_claims,
        }
    }

    /// Absolute expiry instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.acquired_at + chrono::Duration::seconds(self.expires_in_secs)
    }

    /// Seconds of lifetime left at `now`; negative once expired.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds()
    }

    /// Whether the credential may still be presented at `now`.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    /// Whether the credential is inside the proactive-renewal window.
    #[must_use]
    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) <= RENEWAL_BUFFER_SECS
    }

    /// Whether a refresh context is available for silent renewal.
    #[must_use]
    pub const fn can_renew(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Whether the given permission was granted.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.granted_scopes.iter().any(|s| s == scope)
    }

    /// The subject claim identifying the authenticated principal.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.identity_claims.get("sub").and_then(ClaimValue::as_str)
    }

    /// The human-readable display name claim.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.identity_claims
            .get("name")
            .and_then(ClaimValue::as_str)
    }

    /// The email claim.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.identity_claims
            .get("email")
            .and_then(ClaimValue::as_str)
    }

    /// Group membership claims; empty when the provider sent none.
    #[must_use]
    pub fn groups(&self) -> Vec<&str> {
        self.identity_claims
            .get("groups")
            .map(ClaimValue::as_list)
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claims() -> BTreeMap<String, ClaimValue> {
        let mut map = BTreeMap::new();
        map.insert(
            "sub".to_string(),
            ClaimValue::Single("user-42".to_string()),
        );
        map.insert(
            "name".to_string(),
            ClaimValue::Single("Pat Example".to_string()),
        );
        map.insert(
            "groups".to_string(),
            ClaimValue::Many(vec!["finance".to_string(), "admins".to_string()]),
        );
        map
    }

    fn credential_at(now: DateTime<Utc>, expires_in_secs: i64) -> Credential {
        Credential::new(
            "tok-abc".to_string(),
            vec!["accounting:read".to_string(), "accounting:write".to_string()],
            expires_in_secs,
            Some("refresh-xyz".to_string()),
            claims(),
            now,
        )
    }

    #[test]
    fn test_expiry_math() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let cred = credential_at(now, 3600);

        assert!(cred.is_usable(now));
        assert_eq!(cred.remaining_seconds(now), 3600);

        let later = now + chrono::Duration::seconds(3599);
        assert!(cred.is_usable(later));

        let expired = now + chrono::Duration::seconds(3600);
        assert!(!cred.is_usable(expired));
    }

    #[test]
    fn test_renewal_window() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let cred = credential_at(now, 3600);

        assert!(!cred.needs_renewal(now));

        let near_expiry = now + chrono::Duration::seconds(3600 - RENEWAL_BUFFER_SECS);
        assert!(cred.needs_renewal(near_expiry));

        let just_outside = now + chrono::Duration::seconds(3600 - RENEWAL_BUFFER_SECS - 1);
        assert!(!cred.needs_renewal(just_outside));
    }

    #[test]
    fn test_scope_check() {
        let now = Utc::now();
        let cred = credential_at(now, 3600);
        assert!(cred.has_scope("accounting:write"));
        assert!(!cred.has_scope("accounting:admin"));
    }

    #[test]
    fn test_typed_claim_accessors() {
        let now = Utc::now();
        let cred = credential_at(now, 3600);
        assert_eq!(cred.subject(), Some("user-42"));
        assert_eq!(cred.display_name(), Some("Pat Example"));
        assert_eq!(cred.email(), None);
        assert_eq!(cred.groups(), vec!["finance", "admins"]);
    }

    #[test]
    fn test_claim_value_views() {
        let single = ClaimValue::Single("a".to_string());
        assert_eq!(single.as_str(), Some("a"));
        assert_eq!(single.as_list(), vec!["a"]);

        let many = ClaimValue::Many(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(many.as_str(), None);
        assert_eq!(many.as_list(), vec!["a", "b"]);
    }
}
