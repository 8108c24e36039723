//! OAuth identity provider adapter.
//!
//! Implements the [`IdentityProvider`] port over reqwest: authorization
//! code exchange, the RFC 8628 device flow, and refresh-token renewal,
//! with an optional userinfo fetch to populate identity claims.

use async_trait::async_trait;
use chrono::Utc;
use ledgermark_application::IdentityProvider;
use ledgermark_domain::{
    AuthError, ClaimValue, Credential, DeviceCodeChallenge, DevicePollStatus,
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Content-Type for form-urlencoded data.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Grant type for device-code redemption (RFC 8628).
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Token lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Endpoint and client configuration for the identity provider.
#[derive(Debug, Clone)]
pub struct IdentityEndpoints {
    /// Token endpoint URL.
    pub token_url: String,
    /// Device authorization endpoint URL.
    pub device_authorization_url: String,
    /// Userinfo endpoint for identity claims, when the provider has one.
    pub userinfo_url: Option<String>,
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Scopes to request.
    pub scopes: Vec<String>,
}

/// Token response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Error response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Device authorization response (RFC 8628 §3.2).
#[derive(Debug, Deserialize)]
struct DeviceAuthorizationResponse {
    device_code: String,
    user_code: String,
    /// Some providers send `verification_uri`, others `verification_url`.
    #[serde(alias = "verification_url")]
    verification_uri: String,
    expires_in: i64,
    #[serde(default = "default_interval")]
    interval: u64,
}

const fn default_interval() -> u64 {
    5
}

/// Why a token request did not produce a token.
enum TokenRequestError {
    /// The provider answered with a structured OAuth error code.
    Denied { code: String, description: String },
    /// Transport fault or a response that did not parse.
    Fault(String),
}

/// Identity provider client speaking standard OAuth 2.0.
pub struct OAuthIdentityClient {
    http_client: reqwest::Client,
    endpoints: IdentityEndpoints,
}

impl OAuthIdentityClient {
    /// Create a client over the given endpoints.
    #[must_use]
    pub fn new(endpoints: IdentityEndpoints) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoints,
        }
    }

    /// Post a form to the token endpoint and parse the outcome.
    async fn post_token(
        &self,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, TokenRequestError> {
        let body = serde_urlencoded::to_string(params)
            .map_err(|e| TokenRequestError::Fault(format!("failed to encode form: {e}")))?;

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| TokenRequestError::Fault(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&error_text) {
                return Err(TokenRequestError::Denied {
                    description: err.error_description.unwrap_or_else(|| err.error.clone()),
                    code: err.error,
                });
            }
            return Err(TokenRequestError::Fault(format!(
                "token request failed: {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TokenRequestError::Fault(format!("failed to parse token response: {e}")))
    }

    /// Fetch identity claims from the userinfo endpoint, best effort.
    async fn fetch_claims(&self, access_token: &str) -> BTreeMap<String, ClaimValue> {
        let Some(userinfo_url) = self.endpoints.userinfo_url.as_deref() else {
            return BTreeMap::new();
        };

        let response = self
            .http_client
            .get(userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await;
        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await
            {
                Ok(value) => claims_from_json(&value),
                Err(e) => {
                    tracing::warn!(error = %e, "userinfo response did not parse; claims empty");
                    BTreeMap::new()
                }
            },
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "userinfo fetch refused; claims empty");
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "userinfo fetch failed; claims empty");
                BTreeMap::new()
            }
        }
    }

    /// Build a credential from a token response plus fetched claims.
    async fn credential_from(&self, token: TokenResponse) -> Credential {
        let identity_claims = self.fetch_claims(&token.access_token).await;
        Credential::new(
            token.access_token,
            parse_scopes(token.scope.as_deref()),
            token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            token.refresh_token,
            identity_claims,
            Utc::now(),
        )
    }
}

#[async_trait]
impl IdentityProvider for OAuthIdentityClient {
    async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.endpoints.client_id.as_str()),
            ("client_secret", self.endpoints.client_secret.as_str()),
        ];

        match self.post_token(&params).await {
            Ok(token) => Ok(self.credential_from(token).await),
            Err(err) => Err(map_grant_error(err)),
        }
    }

    async fn begin_device_authorization(&self) -> Result<DeviceCodeChallenge, AuthError> {
        let scope = self.endpoints.scopes.join(" ");
        let params = [
            ("client_id", self.endpoints.client_id.as_str()),
            ("scope", scope.as_str()),
        ];
        let body = serde_urlencoded::to_string(params).map_err(|e| AuthError::ProviderFailure {
            message: format!("failed to encode form: {e}"),
        })?;

        let response = self
            .http_client
            .post(&self.endpoints.device_authorization_url)
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::ProviderFailure {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AuthError::ProviderFailure {
                message: format!("device authorization refused: {}", response.status()),
            });
        }

        let device: DeviceAuthorizationResponse =
            response.json().await.map_err(|e| AuthError::ProviderFailure {
                message: format!("failed to parse device authorization response: {e}"),
            })?;

        Ok(DeviceCodeChallenge {
            device_code: device.device_code,
            user_code: device.user_code,
            verification_url: device.verification_uri,
            interval_secs: device.interval,
            expires_at: Utc::now() + chrono::Duration::seconds(device.expires_in),
        })
    }

    async fn poll_device_token(
        &self,
        challenge: &DeviceCodeChallenge,
    ) -> Result<DevicePollStatus, AuthError> {
        let params = [
            ("grant_type", DEVICE_GRANT_TYPE),
            ("device_code", challenge.device_code.as_str()),
            ("client_id", self.endpoints.client_id.as_str()),
            ("client_secret", self.endpoints.client_secret.as_str()),
        ];

        match self.post_token(&params).await {
            Ok(token) => Ok(DevicePollStatus::Complete(self.credential_from(token).await)),
            Err(TokenRequestError::Denied { code, description }) => {
                match map_device_poll_error(&code) {
                    DevicePollDisposition::Pending => Ok(DevicePollStatus::Pending),
                    DevicePollDisposition::Expired => Err(AuthError::Expired),
                    DevicePollDisposition::Declined => Err(AuthError::ReauthRequired),
                    DevicePollDisposition::Fault => Err(AuthError::ProviderFailure {
                        message: description,
                    }),
                }
            }
            Err(TokenRequestError::Fault(message)) => Err(AuthError::ProviderFailure { message }),
        }
    }

    async fn renew_silently(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.endpoints.client_id.as_str()),
            ("client_secret", self.endpoints.client_secret.as_str()),
        ];

        match self.post_token(&params).await {
            Ok(token) => Ok(self.credential_from(token).await),
            Err(err) => Err(map_grant_error(err)),
        }
    }
}

/// How a device-poll OAuth error code should be treated.
#[derive(Debug, PartialEq, Eq)]
enum DevicePollDisposition {
    Pending,
    Expired,
    Declined,
    Fault,
}

/// RFC 8628 §3.5 error code mapping for the poll loop.
fn map_device_poll_error(code: &str) -> DevicePollDisposition {
    match code {
        // The user has not acted yet; slow_down also means "keep
        // polling", just later, and the caller owns the cadence.
        "authorization_pending" | "slow_down" => DevicePollDisposition::Pending,
        "expired_token" => DevicePollDisposition::Expired,
        "access_denied" => DevicePollDisposition::Declined,
        _ => DevicePollDisposition::Fault,
    }
}

/// Map a token request failure for the code-exchange and refresh grants.
fn map_grant_error(err: TokenRequestError) -> AuthError {
    match err {
        TokenRequestError::Denied { code, description } => {
            if code == "invalid_grant" {
                // Consumed code or revoked refresh context: the user
                // must authorize again, nothing to retry.
                AuthError::ReauthRequired
            } else {
                AuthError::ProviderFailure {
                    message: description,
                }
            }
        }
        TokenRequestError::Fault(message) => AuthError::ProviderFailure { message },
    }
}

/// Split a space-separated scope string.
fn parse_scopes(scope: Option<&str>) -> Vec<String> {
    scope
        .map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Convert a userinfo JSON object into the open claim map.
fn claims_from_json(value: &serde_json::Value) -> BTreeMap<String, ClaimValue> {
    let mut claims = BTreeMap::new();
    let Some(object) = value.as_object() else {
        return claims;
    };
    for (name, claim) in object {
        match claim {
            serde_json::Value::String(s) => {
                claims.insert(name.clone(), ClaimValue::Single(s.clone()));
            }
            serde_json::Value::Array(items) => {
                let strings: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect();
                claims.insert(name.clone(), ClaimValue::Many(strings));
            }
            serde_json::Value::Number(n) => {
                claims.insert(name.clone(), ClaimValue::Single(n.to_string()));
            }
            serde_json::Value::Bool(b) => {
                claims.insert(name.clone(), ClaimValue::Single(b.to_string()));
            }
            _ => {}
        }
    }
    claims
}
