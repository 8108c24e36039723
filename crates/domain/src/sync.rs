//! Sync batch types: candidates, outcomes, and the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest error detail carried into an audit record.
const MAX_DETAIL_LEN: usize = 500;

/// One external ledger record considered for the mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCandidate {
    /// Unique identifier in the ledger system.
    pub external_id: String,
    /// Whether the record was already marked synced, per the status
    /// lookup performed before the guard runs. Records with `true` are
    /// excluded from any mutating batch.
    pub already_synced: bool,
    /// Transaction amount in cents, when known. Carried for review.
    pub amount_cents: Option<i64>,
    /// Short human-readable description, when known.
    pub description: Option<String>,
}

impl SyncCandidate {
    /// Create a candidate that has not been screened yet.
    #[must_use]
    pub const fn new(external_id: String) -> Self {
        Self {
            external_id,
            already_synced: false,
            amount_cents: None,
            description: None,
        }
    }
}

/// Whether a run is allowed to mutate the ledger system.
///
/// There is deliberately no `Default` impl: the guard's entry point
/// takes the mode as a mandatory explicit argument, and switching to
/// `Live` is a separate opt-in at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Record what would happen; issue no mutating calls.
    DryRun,
    /// Submit each eligible candidate to the ledger system.
    Live,
}

/// Outcome of one attempted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The ledger system acknowledged the write.
    Succeeded,
    /// The ledger system rejected the write or the call faulted.
    Failed {
        /// Sanitized description of the failure. Never contains
        /// credential material or raw provider payloads.
        detail: String,
    },
    /// Dry-run mode; no call was made.
    SkippedDryRun,
    /// The credential lacked the required write scope; no call was made.
    SkippedUnauthorized,
}

impl SyncOutcome {
    /// Stable lower-case label used in the audit artifact.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
            Self::SkippedDryRun => "skipped_dry_run",
            Self::SkippedUnauthorized => "skipped_unauthorized",
        }
    }

    /// The failure detail, blank unless the outcome is `Failed`.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Failed { detail } => detail,
            _ => "",
        }
    }
}

/// Immutable record of one attempted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAuditRecord {
    /// Identifier of the candidate in the ledger system.
    pub external_id: String,
    /// When the guard processed the candidate.
    pub attempted_at: DateTime<Utc>,
    /// What happened.
    pub outcome: SyncOutcome,
    /// Subject claim of the credential active at the time.
    pub actor_identity: String,
}

/// Complete, ordered result of one guard invocation.
///
/// Record order matches input candidate order; downstream consumers
/// read the audit file as a human-readable log of the run. The caller
/// persists this as the per-run audit artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncBatchResult {
    /// Reference stamped on every mutating call of this run.
    pub run_reference: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// One record per processed candidate, in input order.
    pub records: Vec<SyncAuditRecord>,
    /// Count of `Succeeded` outcomes.
    pub succeeded: usize,
    /// Count of `Failed` outcomes.
    pub failed: usize,
    /// Count of skipped outcomes (dry-run or unauthorized).
    pub skipped: usize,
}

impl SyncBatchResult {
    /// Build a result from ordered records, computing summary counts.
    #[must_use]
    pub fn new(
        run_reference: String,
        started_at: DateTime<Utc>,
        records: Vec<SyncAuditRecord>,
    ) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for record in &records {
            match record.outcome {
                SyncOutcome::Succeeded => succeeded += 1,
                SyncOutcome::Failed { .. } => failed += 1,
                SyncOutcome::SkippedDryRun | SyncOutcome::SkippedUnauthorized => skipped += 1,
            }
        }
        Self {
            run_reference,
            started_at,
            records,
            succeeded,
            failed,
            skipped,
        }
    }

    /// Total number of processed candidates.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.records.len()
    }
}

/// Sanitize a raw failure detail before it enters an audit record.
///
/// Removes any occurrence of the bearer token and caps the length so a
/// raw provider payload cannot leak through the audit artifact.
#[must_use]
pub fn sanitize_detail(raw: &str, access_token: &str) -> String {
    let mut detail = if access_token.is_empty() {
        raw.to_string()
    } else {
        raw.replace(access_token, "[redacted]")
    };
    detail.retain(|c| c != '\n' && c != '\r');
    if detail.len() > MAX_DETAIL_LEN {
        let mut end = MAX_DETAIL_LEN;
        while !detail.is_char_boundary(end) {
            end -= 1;
        }
        detail.truncate(end);
    }
    detail
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: &str, outcome: SyncOutcome) -> SyncAuditRecord {
        SyncAuditRecord {
            external_id: id.to_string(),
            attempted_at: Utc::now(),
            outcome,
            actor_identity: "user-42".to_string(),
        }
    }

    #[test]
    fn test_batch_counts() {
        let result = SyncBatchResult::new(
            "LEDGER_SYNC_20250601_120000".to_string(),
            Utc::now(),
            vec![
                record("a", SyncOutcome::Succeeded),
                record(
                    "b",
                    SyncOutcome::Failed {
                        detail: "duplicate".to_string(),
                    },
                ),
                record("c", SyncOutcome::SkippedDryRun),
                record("d", SyncOutcome::SkippedUnauthorized),
            ],
        );

        assert_eq!(result.total(), 4);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 2);
    }

    #[test]
    fn test_outcome_labels_and_detail() {
        assert_eq!(SyncOutcome::Succeeded.label(), "succeeded");
        assert_eq!(SyncOutcome::SkippedDryRun.label(), "skipped_dry_run");
        assert_eq!(
            SyncOutcome::SkippedUnauthorized.label(),
            "skipped_unauthorized"
        );

        let failed = SyncOutcome::Failed {
            detail: "duplicate".to_string(),
        };
        assert_eq!(failed.label(), "failed");
        assert_eq!(failed.detail(), "duplicate");
        assert_eq!(SyncOutcome::Succeeded.detail(), "");
    }

    #[test]
    fn test_sanitize_redacts_token() {
        let raw = "401 Unauthorized: bearer tok-secret-123 rejected";
        let clean = sanitize_detail(raw, "tok-secret-123");
        assert!(!clean.contains("tok-secret-123"));
        assert!(clean.contains("[redacted]"));
    }

    #[test]
    fn test_sanitize_strips_newlines_and_truncates() {
        let raw = format!("line one\nline two\r{}", "x".repeat(600));
        let clean = sanitize_detail(&raw, "");
        assert!(!clean.contains('\n'));
        assert!(clean.len() <= 500);
    }
}
