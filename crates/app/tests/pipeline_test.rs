//! End-to-end pipeline test: screen candidates, run the guarded sync,
//! and write the audit artifact, with the ledger and clock simulated
//! in process.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ledgermark_application::{Clock, LedgerError, LedgerSystem, SyncGuard};
use ledgermark_domain::{ClaimValue, Credential, SyncMode, SyncOutcome};
use ledgermark_infrastructure::write_audit_csv;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn run_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Ledger double: a set of already-synced ids, one id that the ledger
/// rejects, and a log of mutating calls.
#[derive(Default)]
struct FakeLedger {
    synced_ids: HashSet<String>,
    rejected_id: Option<String>,
    mark_calls: Mutex<Vec<String>>,
}

#[async_trait]
impl LedgerSystem for FakeLedger {
    async fn check_sync_status(
        &self,
        external_id: &str,
        access_token: &str,
    ) -> Result<bool, LedgerError> {
        if access_token.is_empty() {
            return Err(LedgerError::Transport {
                message: "401 unauthorized".to_string(),
            });
        }
        Ok(self.synced_ids.contains(external_id))
    }

    async fn mark_synced(
        &self,
        external_id: &str,
        _access_token: &str,
        _run_reference: &str,
    ) -> Result<(), LedgerError> {
        self.mark_calls.lock().unwrap().push(external_id.to_string());
        if self.rejected_id.as_deref() == Some(external_id) {
            return Err(LedgerError::Rejected {
                reason: "duplicate".to_string(),
            });
        }
        Ok(())
    }
}

fn write_credential() -> Credential {
    let mut claims = BTreeMap::new();
    claims.insert(
        "sub".to_string(),
        ClaimValue::Single("finance-bot".to_string()),
    );
    Credential::new(
        "tok-live".to_string(),
        vec!["accounting:read".to_string(), "accounting:write".to_string()],
        3600,
        None,
        claims,
        run_start(),
    )
}

#[tokio::test]
async fn test_live_run_end_to_end_with_audit_file() {
    let ledger = FakeLedger {
        synced_ids: HashSet::from(["tx-b".to_string()]),
        rejected_id: Some("tx-c".to_string()),
        ..FakeLedger::default()
    };
    let guard = SyncGuard::new(ledger, FixedClock(run_start()));
    let credential = write_credential();

    let candidates = guard
        .screen_candidates(
            vec!["tx-a".to_string(), "tx-b".to_string(), "tx-c".to_string()],
            &credential,
        )
        .await
        .unwrap();
    assert!(candidates[1].already_synced);

    let result = guard.run_sync(candidates, &credential, SyncMode::Live).await;

    // tx-b was excluded before the batch; tx-a succeeded, tx-c failed.
    assert_eq!(result.total(), 2);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.run_reference, "LEDGER_SYNC_20250601_120000");
    assert_eq!(result.records[0].external_id, "tx-a");
    assert_eq!(result.records[0].outcome, SyncOutcome::Succeeded);
    assert_eq!(result.records[1].actor_identity, "finance-bot");

    let dir = TempDir::new().unwrap();
    let path = write_audit_csv(&result, dir.path()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();

    assert_eq!(
        lines[0],
        "external_id,attempted_at,outcome,error_detail,actor_identity"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("tx-a,"));
    assert!(lines[2].contains("failed"));
    assert!(lines[2].contains("duplicate"));
}

#[tokio::test]
async fn test_dry_run_end_to_end_never_mutates() {
    let ledger = FakeLedger::default();
    let guard = SyncGuard::new(ledger, FixedClock(run_start()));
    let credential = write_credential();

    let candidates = guard
        .screen_candidates(vec!["tx-a".to_string(), "tx-b".to_string()], &credential)
        .await
        .unwrap();
    let result = guard
        .run_sync(candidates, &credential, SyncMode::DryRun)
        .await;

    assert_eq!(result.total(), 2);
    assert_eq!(result.skipped, 2);
    assert!(
        result
            .records
            .iter()
            .all(|r| r.outcome == SyncOutcome::SkippedDryRun)
    );

    let dir = TempDir::new().unwrap();
    let path = write_audit_csv(&result, dir.path()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.matches("skipped_dry_run").count(), 2);
}
