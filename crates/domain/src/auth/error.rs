//! Authentication error taxonomy.

use thiserror::Error;

/// Authentication and authorization-flow errors.
///
/// The taxonomy keeps "try again" distinct from "ask the user to
/// re-authenticate": only `ProviderFailure` is retryable with backoff;
/// `CsrfRejected` always ends the current session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The callback's state proof failed validation, or an
    /// authorization code was replayed. Fatal to the current flow.
    #[error("authorization callback rejected: state validation failed")]
    CsrfRejected,

    /// No usable credential and silent renewal is not possible; the
    /// caller must restart an authorization flow. Expected, not loud.
    #[error("re-authentication required")]
    ReauthRequired,

    /// A challenge or token validity window elapsed.
    #[error("authorization challenge expired")]
    Expired,

    /// The credential lacks a required permission; a new consent grant
    /// is needed, retrying will not help.
    #[error("missing required scope: {scope}")]
    Unauthorized {
        /// The scope that was required but not granted.
        scope: String,
    },

    /// Transport fault or malformed response from the identity
    /// provider. Retryable with caller-controlled backoff.
    #[error("identity provider failure: {message}")]
    ProviderFailure {
        /// Sanitized description of the fault.
        message: String,
    },

    /// The flow was invoked with an unusable configuration.
    #[error("invalid authorization configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong with the configuration.
        message: String,
    },
}

impl AuthError {
    /// Whether the caller may retry the same operation with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderFailure { .. })
    }

    /// Whether the caller should restart an authorization flow.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(self, Self::ReauthRequired | Self::Expired)
    }
}
