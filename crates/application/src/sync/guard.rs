//! The sync guard: decides whether, once, and with what record a
//! "mark synced" write is permitted.
//!
//! Marking a record synced in the ledger system is irreversible, so the
//! guard enforces three gates before any call leaves the process:
//! already-synced candidates are excluded outright, live mode requires
//! the write scope, and dry-run (the default posture everywhere in the
//! surrounding application) never mutates. Every processed candidate
//! yields exactly one audit record, in input order.

use ledgermark_domain::{
    sanitize_detail, Credential, SyncAuditRecord, SyncBatchResult, SyncCandidate, SyncMode,
    SyncOutcome,
};

use crate::ports::{Clock, LedgerError, LedgerSystem};

/// Scope required for the mutating call in live mode.
pub const REQUIRED_WRITE_SCOPE: &str = "accounting:write";

/// Gates and executes the mutating sync operation for a batch.
pub struct SyncGuard<L, C> {
    ledger: L,
    clock: C,
}

impl<L: LedgerSystem, C: Clock> SyncGuard<L, C> {
    /// Create a guard over the given ledger collaborator.
    #[must_use]
    pub const fn new(ledger: L, clock: C) -> Self {
        Self { ledger, clock }
    }

    /// Populate `already_synced` for each id via the ledger's status
    /// lookup, preserving input order.
    ///
    /// # Errors
    /// Returns the first [`LedgerError`] hit; screening is a read and
    /// is safe to rerun.
    pub async fn screen_candidates(
        &self,
        external_ids: Vec<String>,
        credential: &Credential,
    ) -> Result<Vec<SyncCandidate>, LedgerError> {
        let mut candidates = Vec::with_capacity(external_ids.len());
        for external_id in external_ids {
            let already_synced = self
                .ledger
                .check_sync_status(&external_id, &credential.access_token)
                .await?;
            candidates.push(SyncCandidate {
                already_synced,
                ..SyncCandidate::new(external_id)
            });
        }
        Ok(candidates)
    }

    /// Run one guarded batch.
    ///
    /// Candidates already marked synced are dropped without a record;
    /// they were never candidates for this run. The remaining ones are
    /// processed strictly in input order, one ledger call each, with no
    /// batching and no early abort: one candidate's failure never
    /// blocks the others. The caller persists the returned batch as the
    /// run's audit artifact; the guard performs no durable writes.
    pub async fn run_sync(
        &self,
        candidates: Vec<SyncCandidate>,
        credential: &Credential,
        mode: SyncMode,
    ) -> SyncBatchResult {
        let started_at = self.clock.now();
        let run_reference = format!("LEDGER_SYNC_{}", started_at.format("%Y%m%d_%H%M%S"));
        let actor_identity = credential.subject().unwrap_or("unknown").to_string();

        let authorized = credential.has_scope(REQUIRED_WRITE_SCOPE);
        if mode == SyncMode::Live && !authorized {
            tracing::warn!(
                scope = REQUIRED_WRITE_SCOPE,
                "live sync requested without the write scope; no calls will be made"
            );
        }

        let mut records = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.already_synced {
                tracing::debug!(external_id = %candidate.external_id, "already synced, excluded from batch");
                continue;
            }

            let attempted_at = self.clock.now();
            let outcome = match mode {
                SyncMode::DryRun => SyncOutcome::SkippedDryRun,
                SyncMode::Live if !authorized => SyncOutcome::SkippedUnauthorized,
                SyncMode::Live => {
                    match self
                        .ledger
                        .mark_synced(
                            &candidate.external_id,
                            &credential.access_token,
                            &run_reference,
                        )
                        .await
                    {
                        Ok(()) => SyncOutcome::Succeeded,
                        Err(err) => {
                            let raw = match err {
                                LedgerError::Rejected { reason } => reason,
                                LedgerError::Transport { message } => message,
                            };
                            SyncOutcome::Failed {
                                detail: sanitize_detail(&raw, &credential.access_token),
                            }
                        }
                    }
                }
            };

            tracing::info!(
                external_id = %candidate.external_id,
                outcome = outcome.label(),
                "sync candidate processed"
            );
            records.push(SyncAuditRecord {
                external_id: candidate.external_id,
                attempted_at,
                outcome,
                actor_identity: actor_identity.clone(),
            });
        }

        let result = SyncBatchResult::new(run_reference, started_at, records);
        tracing::info!(
            total = result.total(),
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            "sync batch complete"
        );
        result
    }
}
