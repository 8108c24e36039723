//! Ledgermark Application - Authorization flows and the sync guard
//!
//! This crate holds the use-case logic: the anti-forgery state token
//! codec, the session token store, the authorization flow controller,
//! and the guard that gates the mutating "mark synced" operation.
//! External systems are reached only through the port traits in
//! [`ports`].

pub mod auth;
pub mod ports;
pub mod sync;

pub use auth::{
    AuthorizationFlowController, FlowState, RedirectConfig, RedirectInstruction, StateTokenCodec,
    StateTokenError, TokenStore,
};
pub use ports::{Clock, IdentityProvider, LedgerError, LedgerSystem};
pub use sync::{SyncGuard, REQUIRED_WRITE_SCOPE};
