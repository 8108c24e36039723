//! Identity provider port
//!
//! Defines the interface to the external identity provider. The flow
//! controller drives these calls; it never touches HTTP itself.

use async_trait::async_trait;
use ledgermark_domain::{AuthError, Credential, DeviceCodeChallenge, DevicePollStatus};

/// Interface to the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code received on the redirect callback
    /// for a credential.
    ///
    /// # Errors
    /// Returns [`AuthError::ProviderFailure`] on transport or
    /// malformed-response faults, or a grant-specific error when the
    /// provider rejects the code.
    async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AuthError>;

    /// Request a device-code challenge for clients that cannot receive
    /// redirects.
    ///
    /// # Errors
    /// Returns [`AuthError::ProviderFailure`] when the provider cannot
    /// issue a challenge.
    async fn begin_device_authorization(&self) -> Result<DeviceCodeChallenge, AuthError>;

    /// Poll once for the outcome of a device-code challenge.
    ///
    /// # Errors
    /// Returns [`AuthError::Expired`] when the challenge's window
    /// elapsed on the provider side, [`AuthError::ReauthRequired`] when
    /// the user declined, or [`AuthError::ProviderFailure`] on faults.
    /// A user who has not acted yet is NOT an error: the call returns
    /// `Ok(DevicePollStatus::Pending)`.
    async fn poll_device_token(
        &self,
        challenge: &DeviceCodeChallenge,
    ) -> Result<DevicePollStatus, AuthError>;

    /// Obtain a fresh credential from a stored refresh context without
    /// user interaction.
    ///
    /// # Errors
    /// Returns [`AuthError::ReauthRequired`] when the provider rejects
    /// the refresh grant, or [`AuthError::ProviderFailure`] on faults.
    async fn renew_silently(&self, refresh_token: &str) -> Result<Credential, AuthError>;
}
