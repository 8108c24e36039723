//! Ledger system port
//!
//! Defines the interface to the external financial system against which
//! the mutating "mark as synced" operation is performed.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the ledger system collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger system rejected the operation for this record.
    #[error("ledger rejected record: {reason}")]
    Rejected {
        /// Raw rejection reason; sanitized before entering the audit.
        reason: String,
    },

    /// Transport fault or malformed response.
    #[error("ledger transport failure: {message}")]
    Transport {
        /// Description of the fault.
        message: String,
    },
}

/// Interface to the external ledger system.
#[async_trait]
pub trait LedgerSystem: Send + Sync {
    /// Look up whether a record is already marked synced.
    ///
    /// # Errors
    /// Returns [`LedgerError::Transport`] when the lookup fails.
    async fn check_sync_status(
        &self,
        external_id: &str,
        access_token: &str,
    ) -> Result<bool, LedgerError>;

    /// Mark one record as synced, stamped with the run reference.
    /// Irreversible in the ledger system.
    ///
    /// # Errors
    /// Returns [`LedgerError::Rejected`] when the ledger refuses the
    /// write, or [`LedgerError::Transport`] on faults.
    async fn mark_synced(
        &self,
        external_id: &str,
        access_token: &str,
        run_reference: &str,
    ) -> Result<(), LedgerError>;
}
