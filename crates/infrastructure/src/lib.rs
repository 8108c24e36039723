//! Ledgermark Infrastructure - Adapters for external systems
//!
//! Implements the application ports against real collaborators: the
//! OAuth identity provider and the ledger API over reqwest, the system
//! clock, TOML/environment configuration, and the audit CSV export.

pub mod clock;
pub mod config;
pub mod export;
pub mod identity;
pub mod ledger;

pub use clock::SystemClock;
pub use config::{AppConfig, ConfigError, ExportConfig, IdentityConfig, LedgerConfig, Secrets};
pub use export::{write_audit_csv, ExportError};
pub use identity::{IdentityEndpoints, OAuthIdentityClient};
pub use ledger::{LedgerApiClient, LedgerTransaction};
