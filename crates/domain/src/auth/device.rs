//! Device-code fallback flow types.

use crate::auth::Credential;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending device authorization the user approves out of band.
///
/// The client shows `user_code` and `verification_url` to the user and
/// polls for completion at `interval_secs`. Device codes expire on
/// their own; abandoning the poll loop needs no cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeChallenge {
    /// Opaque code the client presents when polling. Not shown to users.
    pub device_code: String,
    /// Short code the user types at the verification URL.
    pub user_code: String,
    /// Where the user approves the request on a separate device.
    pub verification_url: String,
    /// Protocol-specified polling interval in seconds.
    pub interval_secs: u64,
    /// When the challenge stops being redeemable.
    pub expires_at: DateTime<Utc>,
}

impl DeviceCodeChallenge {
    /// Whether the challenge's validity window has elapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of one device-code poll.
///
/// `Pending` is an expected state while the user has not yet approved,
/// not an error; the caller simply polls again after the interval.
#[derive(Debug, Clone)]
pub enum DevicePollStatus {
    /// The user has not approved yet; poll again after the interval.
    Pending,
    /// The user approved and a credential was issued.
    Complete(Credential),
}

impl DevicePollStatus {
    /// Whether the poll completed with a credential.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}
