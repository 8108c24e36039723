//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An external ledger record identifier is empty or malformed.
    #[error("invalid external id: {0}")]
    InvalidExternalId(String),

    /// A scope string is empty or contains whitespace.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// A state token string does not have the expected wire shape.
    #[error("malformed state token")]
    MalformedStateToken,

    /// A credential field is out of range (e.g. negative lifetime).
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
