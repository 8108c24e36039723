//! Authorization flow controller.
//!
//! Drives the state machine of obtaining a credential: redirect-based
//! authorization-code exchange with signed anti-forgery state, the
//! device-code fallback for clients that cannot receive redirects, and
//! silent renewal ahead of expiry. All provider traffic goes through
//! the [`IdentityProvider`] port.

use std::collections::HashSet;
use std::sync::Arc;

use ledgermark_domain::{AuthError, Credential, DeviceCodeChallenge, DevicePollStatus};
use url::Url;

use crate::auth::{StateTokenCodec, TokenStore};
use crate::ports::{Clock, IdentityProvider};

/// Everything needed to send the user to the provider's consent page.
#[derive(Debug, Clone)]
pub struct RedirectInstruction {
    /// Fully assembled authorization URL, `state` included.
    pub authorize_url: Url,
    /// The state token in wire form, as embedded in the URL.
    pub state: String,
}

/// Observable position in the authorization state machine.
///
/// Callback receipt and renewal are transient within a single call and
/// are not observable states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No credential held and no flow in progress.
    Unauthenticated,
    /// A redirect was issued; waiting for the provider callback.
    RedirectPending,
    /// A device challenge is outstanding; waiting for user approval.
    DeviceCodePending,
    /// A credential is held in the token store.
    Authenticated,
}

/// Static parameters of the redirect flow.
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    /// The provider's authorization endpoint.
    pub authorize_url: Url,
    /// OAuth client identifier.
    pub client_id: String,
    /// Callback URI registered with the provider.
    pub redirect_uri: String,
    /// Scopes to request.
    pub scopes: Vec<String>,
}

/// Drives credential acquisition and renewal for one user session.
///
/// Owns the session's [`TokenStore`] exclusively; other components
/// obtain credentials through [`Self::ensure_fresh`] rather than
/// reaching into the store.
pub struct AuthorizationFlowController<I, C> {
    provider: I,
    clock: C,
    codec: Arc<StateTokenCodec>,
    redirect: RedirectConfig,
    tokens: TokenStore,
    state: FlowState,
    /// Best-effort secondary nonce: the wire form of the last issued
    /// state token, when this instance issued it. Its absence is never
    /// a validation failure; the signed path stands alone.
    session_nonce: Option<String>,
    /// Authorization codes already exchanged. Codes are single-use by
    /// protocol design; a repeat callback must fail, not silently
    /// re-authenticate.
    consumed_codes: HashSet<String>,
    device_challenge: Option<DeviceCodeChallenge>,
}

impl<I: IdentityProvider, C: Clock> AuthorizationFlowController<I, C> {
    /// Create a controller for a fresh, unauthenticated session.
    #[must_use]
    pub fn new(provider: I, clock: C, codec: Arc<StateTokenCodec>, redirect: RedirectConfig) -> Self {
        Self {
            provider,
            clock,
            codec,
            redirect,
            tokens: TokenStore::new(),
            state: FlowState::Unauthenticated,
            session_nonce: None,
            consumed_codes: HashSet::new(),
            device_challenge: None,
        }
    }

    /// Current position in the state machine.
    #[must_use]
    pub const fn state(&self) -> FlowState {
        self.state
    }

    /// The held credential, without freshness guarantees.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.tokens.get()
    }

    /// Start the redirect-based flow: issue a state token and build the
    /// provider's authorization URL with it embedded as `state`.
    #[must_use]
    pub fn begin_redirect_flow(&mut self) -> RedirectInstruction {
        let token = self.codec.issue(self.clock.now());
        let state = token.encode();
        self.session_nonce = Some(state.clone());

        let mut authorize_url = self.redirect.authorize_url.clone();
        authorize_url
            .query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.redirect.client_id)
            .append_pair("redirect_uri", &self.redirect.redirect_uri)
            .append_pair("scope", &self.redirect.scopes.join(" "))
            .append_pair("state", &state);

        self.state = FlowState::RedirectPending;
        RedirectInstruction {
            authorize_url,
            state,
        }
    }

    /// Handle the provider callback: validate the state proof, then
    /// exchange the authorization code for a credential.
    ///
    /// The state is accepted when the signed validation passes OR the
    /// session-stored nonce matches; a missing session nonce is never a
    /// failure, since a callback may land on an instance that did not
    /// issue the redirect. Each authorization code is exchanged at most
    /// once; a repeat fails without contacting the provider.
    ///
    /// # Errors
    /// [`AuthError::CsrfRejected`] on state rejection or code replay;
    /// the caller must discard the session. Exchange errors propagate
    /// from the provider.
    pub async fn complete_redirect_flow(
        &mut self,
        received_state: &str,
        code: &str,
    ) -> Result<Credential, AuthError> {
        let now = self.clock.now();

        let signed_ok = self.codec.validate_str(received_state, now).is_ok();
        let session_ok = self
            .session_nonce
            .as_deref()
            .is_some_and(|nonce| nonce == received_state);
        if !signed_ok && !session_ok {
            tracing::warn!("authorization callback rejected: state proof invalid");
            self.state = FlowState::Unauthenticated;
            return Err(AuthError::CsrfRejected);
        }

        // Mark the code consumed before the exchange so that even a
        // concurrent or failed repeat can never trigger a second one.
        if !self.consumed_codes.insert(code.to_string()) {
            tracing::warn!("authorization callback rejected: code replay");
            return Err(AuthError::CsrfRejected);
        }
        self.session_nonce = None;

        let mut credential = self
            .provider
            .exchange_authorization_code(code, &self.redirect.redirect_uri)
            .await?;
        credential.acquired_at = now;

        self.tokens.set(credential.clone(), now);
        self.state = FlowState::Authenticated;
        tracing::info!(subject = credential.subject().unwrap_or("unknown"), "session authenticated via redirect flow");
        Ok(credential)
    }

    /// Start the device-code fallback flow.
    ///
    /// # Errors
    /// Propagates provider errors from challenge creation.
    pub async fn begin_device_flow(&mut self) -> Result<DeviceCodeChallenge, AuthError> {
        let challenge = self.provider.begin_device_authorization().await?;
        self.device_challenge = Some(challenge.clone());
        self.state = FlowState::DeviceCodePending;
        Ok(challenge)
    }

    /// Poll once for the outstanding device challenge.
    ///
    /// The caller owns the polling cadence and may stop at any time;
    /// device codes expire on their own and need no cleanup.
    ///
    /// # Errors
    /// [`AuthError::Expired`] once the challenge window elapses,
    /// [`AuthError::InvalidConfiguration`] when no challenge is
    /// outstanding; provider errors propagate.
    pub async fn poll_device(&mut self) -> Result<DevicePollStatus, AuthError> {
        let now = self.clock.now();
        let Some(challenge) = self.device_challenge.as_ref() else {
            return Err(AuthError::InvalidConfiguration {
                message: "no device authorization in progress".to_string(),
            });
        };

        if challenge.is_expired(now) {
            self.device_challenge = None;
            self.state = FlowState::Unauthenticated;
            return Err(AuthError::Expired);
        }

        match self.provider.poll_device_token(challenge).await {
            Ok(DevicePollStatus::Pending) => Ok(DevicePollStatus::Pending),
            Ok(DevicePollStatus::Complete(mut credential)) => {
                credential.acquired_at = now;
                self.tokens.set(credential.clone(), now);
                self.device_challenge = None;
                self.state = FlowState::Authenticated;
                tracing::info!(
                    subject = credential.subject().unwrap_or("unknown"),
                    "session authenticated via device flow"
                );
                Ok(DevicePollStatus::Complete(credential))
            }
            Err(AuthError::Expired) => {
                self.device_challenge = None;
                self.state = FlowState::Unauthenticated;
                Err(AuthError::Expired)
            }
            Err(other) => Err(other),
        }
    }

    /// The call every other component makes before using a credential.
    ///
    /// Returns the held credential unchanged while its remaining
    /// lifetime exceeds the renewal buffer; otherwise attempts silent
    /// renewal. Provider transport faults propagate as retryable
    /// [`AuthError::ProviderFailure`] without destroying the held
    /// credential; a rejected refresh grant clears the store, which is
    /// expected re-authentication, not a loud error.
    ///
    /// # Errors
    /// [`AuthError::ReauthRequired`] when no usable credential can be
    /// produced without user interaction.
    pub async fn ensure_fresh(&mut self) -> Result<Credential, AuthError> {
        let now = self.clock.now();
        let Some(held) = self.tokens.get() else {
            return Err(AuthError::ReauthRequired);
        };

        if held.is_usable(now) && !held.needs_renewal(now) {
            return Ok(held.clone());
        }

        let Some(refresh_token) = held.refresh_token.clone() else {
            tracing::debug!("credential expiring with no refresh context; re-authentication required");
            self.tokens.clear();
            self.state = FlowState::Unauthenticated;
            return Err(AuthError::ReauthRequired);
        };

        match self.provider.renew_silently(&refresh_token).await {
            Ok(mut renewed) => {
                renewed.acquired_at = now;
                // Providers may omit the refresh token on renewal; keep
                // the previous context so the session can renew again.
                if renewed.refresh_token.is_none() {
                    renewed.refresh_token = Some(refresh_token);
                }
                self.tokens.set(renewed.clone(), now);
                self.state = FlowState::Authenticated;
                tracing::debug!("credential renewed silently");
                Ok(renewed)
            }
            Err(err @ AuthError::ProviderFailure { .. }) => {
                tracing::warn!(error = %err, "silent renewal hit a provider fault; retryable");
                Err(err)
            }
            Err(err) => {
                tracing::debug!(error = %err, "silent renewal rejected; re-authentication required");
                self.tokens.clear();
                self.state = FlowState::Unauthenticated;
                Err(AuthError::ReauthRequired)
            }
        }
    }

    /// Explicit sign-out: destroy the credential and all flow state.
    pub fn sign_out(&mut self) {
        self.tokens.clear();
        self.session_nonce = None;
        self.device_challenge = None;
        self.state = FlowState::Unauthenticated;
    }
}
