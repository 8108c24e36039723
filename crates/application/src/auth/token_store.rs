//! Session-scoped credential storage.
//!
//! One store per user session, exclusively owned by the session's
//! control flow. It is deliberately NOT a process-wide singleton and is
//! never shared across sessions or threads; the flow controller owns it
//! and passes credentials out by clone.

use chrono::{DateTime, Utc};
use ledgermark_domain::Credential;

/// Holder of the current access credential for one session.
#[derive(Debug, Default)]
pub struct TokenStore {
    credential: Option<Credential>,
}

impl TokenStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { credential: None }
    }

    /// The held credential, if any.
    #[must_use]
    pub const fn get(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Replace the held credential, stamping the acquisition time.
    pub fn set(&mut self, mut credential: Credential, now: DateTime<Utc>) {
        credential.acquired_at = now;
        self.credential = Some(credential);
    }

    /// Destroy the held credential (sign-out or unrecoverable failure).
    pub fn clear(&mut self) {
        self.credential = None;
    }

    /// Remove and return the held credential.
    pub const fn take(&mut self) -> Option<Credential> {
        self.credential.take()
    }

    /// Whether a credential is currently held.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.credential.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn credential() -> Credential {
        Credential::new(
            "access123".to_string(),
            vec!["accounting:read".to_string()],
            3600,
            None,
            BTreeMap::new(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_set_and_get() {
        let mut store = TokenStore::new();
        assert!(store.get().is_none());

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        store.set(credential(), now);

        let held = store.get().unwrap();
        assert_eq!(held.access_token, "access123");
        // Acquisition time is stamped by the store, not the caller.
        assert_eq!(held.acquired_at, now);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut store = TokenStore::new();
        let now = Utc::now();
        store.set(credential(), now);

        let mut renewed = credential();
        renewed.access_token = "access456".to_string();
        store.set(renewed, now);

        assert_eq!(store.get().unwrap().access_token, "access456");
    }

    #[test]
    fn test_clear_destroys_credential() {
        let mut store = TokenStore::new();
        store.set(credential(), Utc::now());
        assert!(store.is_populated());

        store.clear();
        assert!(!store.is_populated());
        assert!(store.get().is_none());
    }

    #[test]
    fn test_take_empties_the_store() {
        let mut store = TokenStore::new();
        store.set(credential(), Utc::now());

        let taken = store.take();
        assert!(taken.is_some());
        assert!(store.take().is_none());
    }
}
