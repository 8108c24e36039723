//! Audit artifact export.
//!
//! Writes the per-run audit trail to a timestamped CSV file so every
//! mutating run leaves a reviewable record on disk.

use std::fs;
use std::path::{Path, PathBuf};

use ledgermark_domain::SyncBatchResult;
use thiserror::Error;

/// Errors raised while writing the audit artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem failure while creating the directory or file.
    #[error("failed to write audit file: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the audit trail of one run as a CSV file under `output_dir`.
///
/// The filename carries the run's start timestamp, so repeated runs
/// never overwrite each other. Returns the path of the written file.
///
/// # Errors
/// Returns [`ExportError::Io`] when the directory or file cannot be
/// written.
pub fn write_audit_csv(result: &SyncBatchResult, output_dir: &Path) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(output_dir)?;

    let filename = format!(
        "sync_audit_{}.csv",
        result.started_at.format("%Y%m%d_%H%M%S")
    );
    let path = output_dir.join(filename);

    let mut contents =
        String::from("external_id,attempted_at,outcome,error_detail,actor_identity\n");
    for record in &result.records {
        contents.push_str(&csv_field(&record.external_id));
        contents.push(',');
        contents.push_str(&record.attempted_at.to_rfc3339());
        contents.push(',');
        contents.push_str(record.outcome.label());
        contents.push(',');
        contents.push_str(&csv_field(record.outcome.detail()));
        contents.push(',');
        contents.push_str(&csv_field(&record.actor_identity));
        contents.push('\n');
    }

    fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), records = result.records.len(), "wrote audit file");
    Ok(path)
}

/// Quote a field when it contains a delimiter, quote, or line break.
fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') || raw.contains('\r') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
