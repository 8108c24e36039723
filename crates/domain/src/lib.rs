//! Ledgermark Domain - Core business types
//!
//! This crate defines the domain model for the Ledgermark sync guard.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod sync;

pub use auth::{
    AuthError, ClaimValue, Credential, DeviceCodeChallenge, DevicePollStatus, StateToken,
    RENEWAL_BUFFER_SECS,
};
pub use error::{DomainError, DomainResult};
pub use sync::{
    sanitize_detail, SyncAuditRecord, SyncBatchResult, SyncCandidate, SyncMode, SyncOutcome,
};
