//! Command-line surface.

use std::path::PathBuf;

use clap::Parser;

/// Sync ledger transactions into the downstream accounting system,
/// with an audit trail for every run.
#[derive(Debug, Parser)]
#[command(name = "ledgermark", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "ledgermark.toml")]
    pub config: PathBuf,

    /// Start of the transaction date range (inclusive), YYYY-MM-DD.
    #[arg(long)]
    pub start: String,

    /// End of the transaction date range (inclusive), YYYY-MM-DD.
    #[arg(long)]
    pub end: String,

    /// Only consider transactions in this status.
    #[arg(long)]
    pub status: Option<String>,

    /// Actually mark records synced. Without this flag the run is a
    /// dry run: every eligible candidate is recorded, nothing mutates.
    #[arg(long)]
    pub live: bool,

    /// Directory receiving the audit CSV, overriding the config file.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_is_the_default() {
        let cli = Cli::parse_from([
            "ledgermark",
            "--start",
            "2025-06-01",
            "--end",
            "2025-06-30",
        ]);
        assert!(!cli.live);
        assert_eq!(cli.config, PathBuf::from("ledgermark.toml"));
        assert!(cli.status.is_none());
    }

    #[test]
    fn test_live_requires_explicit_flag() {
        let cli = Cli::parse_from([
            "ledgermark",
            "--start",
            "2025-06-01",
            "--end",
            "2025-06-30",
            "--live",
            "--status",
            "cleared",
        ]);
        assert!(cli.live);
        assert_eq!(cli.status.as_deref(), Some("cleared"));
    }
}
