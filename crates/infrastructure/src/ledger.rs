//! Ledger system adapter.
//!
//! Implements the [`LedgerSystem`] port against the ledger's HTTP API:
//! sync-status lookups, the irreversible mark-synced write, and a
//! cursor-paginated transaction listing used to build candidates for a
//! date range.

use async_trait::async_trait;
use ledgermark_application::{LedgerError, LedgerSystem};
use ledgermark_domain::SyncCandidate;
use serde::{Deserialize, Serialize};

/// One transaction row from the ledger listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerTransaction {
    /// Unique identifier in the ledger system.
    pub id: String,
    /// Decimal amount in the account currency.
    #[serde(default)]
    pub amount: Option<f64>,
    /// Merchant or counterparty name.
    #[serde(default)]
    pub merchant_name: Option<String>,
    /// Sync metadata, when the record carries any.
    #[serde(default)]
    pub sync_status: Option<SyncStatusBody>,
}

/// Sync metadata on a transaction record.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncStatusBody {
    /// Whether the record was already marked synced.
    #[serde(default)]
    pub synced: bool,
}

impl LedgerTransaction {
    /// View this transaction as an unscreened sync candidate.
    #[must_use]
    pub fn to_candidate(&self) -> SyncCandidate {
        SyncCandidate {
            external_id: self.id.clone(),
            already_synced: self.sync_status.as_ref().is_some_and(|s| s.synced),
            amount_cents: self.amount.map(amount_to_cents),
            description: self.merchant_name.clone(),
        }
    }
}

/// Convert a decimal amount to integer cents. The float-to-int cast
/// saturates at the `i64` bounds and maps NaN to zero.
#[allow(clippy::cast_possible_truncation)]
fn amount_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Paginated envelope returned by the listing endpoint.
#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[serde(default)]
    data: Vec<LedgerTransaction>,
    /// Cursor for the next page; the API has used both names.
    #[serde(default, alias = "next_cursor")]
    next: Option<String>,
}

/// Body of the mark-synced write.
#[derive(Debug, Serialize)]
struct MarkSyncedBody<'a> {
    synced: bool,
    sync_system: &'a str,
    sync_reference: &'a str,
}

/// HTTP client for the ledger system.
pub struct LedgerApiClient {
    http_client: reqwest::Client,
    base_url: String,
    sync_system: String,
    page_size: u32,
}

impl LedgerApiClient {
    /// Create a client for the given API root.
    #[must_use]
    pub fn new(base_url: &str, sync_system: String, page_size: u32) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            sync_system,
            page_size,
        }
    }

    /// List transactions in a date range, following pagination cursors.
    ///
    /// # Errors
    /// Returns [`LedgerError::Transport`] on faults or non-success
    /// responses.
    pub async fn list_transactions(
        &self,
        access_token: &str,
        start_date: &str,
        end_date: &str,
        status: Option<&str>,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let url = format!("{}/transactions", self.base_url);
        let mut transactions = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![
                ("start_date".to_string(), start_date.to_string()),
                ("end_date".to_string(), end_date.to_string()),
                ("limit".to_string(), self.page_size.to_string()),
            ];
            if let Some(status) = status {
                params.push(("status".to_string(), status.to_string()));
            }
            if let Some(cursor) = &cursor {
                params.push(("cursor".to_string(), cursor.clone()));
            }

            let response = self
                .http_client
                .get(&url)
                .query(&params)
                .bearer_auth(access_token)
                .send()
                .await
                .map_err(|e| LedgerError::Transport {
                    message: e.to_string(),
                })?;

            if !response.status().is_success() {
                return Err(LedgerError::Transport {
                    message: format!("transaction listing refused: {}", response.status()),
                });
            }

            let page: PageEnvelope =
                response.json().await.map_err(|e| LedgerError::Transport {
                    message: format!("failed to parse transaction page: {e}"),
                })?;

            transactions.extend(page.data);
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = transactions.len(), "listed ledger transactions");
        Ok(transactions)
    }
}

#[async_trait]
impl LedgerSystem for LedgerApiClient {
    async fn check_sync_status(
        &self,
        external_id: &str,
        access_token: &str,
    ) -> Result<bool, LedgerError> {
        let url = format!("{}/transactions/{external_id}", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| LedgerError::Transport {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport {
                message: format!("sync status lookup refused: {}", response.status()),
            });
        }

        let transaction: LedgerTransaction =
            response.json().await.map_err(|e| LedgerError::Transport {
                message: format!("failed to parse transaction: {e}"),
            })?;
        Ok(transaction.sync_status.is_some_and(|s| s.synced))
    }

    async fn mark_synced(
        &self,
        external_id: &str,
        access_token: &str,
        run_reference: &str,
    ) -> Result<(), LedgerError> {
        let url = format!("{}/transactions/{external_id}/sync", self.base_url);
        let body = MarkSyncedBody {
            synced: true,
            sync_system: &self.sync_system,
            sync_reference: run_reference,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let reason = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(LedgerError::Rejected {
                reason: if reason.is_empty() {
                    format!("rejected with status {status}")
                } else {
                    reason
                },
            })
        } else {
            Err(LedgerError::Transport {
                message: format!("mark-synced failed with status {status}"),
            })
        }
    }
}
