//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external
//! systems. Each port is a trait implemented by an adapter in the
//! infrastructure layer.

mod clock;
mod identity_provider;
mod ledger;

pub use clock::Clock;
pub use identity_provider::IdentityProvider;
pub use ledger::{LedgerError, LedgerSystem};
