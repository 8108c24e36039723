//! Ledgermark binary.
//!
//! Authenticates against the identity provider over the device flow,
//! lists transactions for the requested date range, and runs the
//! guarded sync, writing an audit CSV for the run.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ledgermark_application::{
    AuthorizationFlowController, RedirectConfig, StateTokenCodec, SyncGuard,
};
use ledgermark_domain::{Credential, SyncMode};
use ledgermark_infrastructure::{
    write_audit_csv, AppConfig, IdentityEndpoints, LedgerApiClient, LedgerTransaction,
    OAuthIdentityClient, Secrets, SystemClock,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = cli::Cli::parse();
    let config = AppConfig::load(&args.config)?;
    let secrets = Secrets::from_env()?;

    let credential = sign_in(&config, &secrets).await?;

    let ledger = LedgerApiClient::new(
        &config.ledger.base_url,
        config.ledger.sync_system.clone(),
        config.ledger.page_size,
    );
    let transactions = ledger
        .list_transactions(
            &credential.access_token,
            &args.start,
            &args.end,
            args.status.as_deref(),
        )
        .await?;
    let candidates: Vec<_> = transactions
        .iter()
        .map(LedgerTransaction::to_candidate)
        .collect();
    tracing::info!(
        count = candidates.len(),
        start = %args.start,
        end = %args.end,
        "transactions listed"
    );

    let mode = if args.live {
        SyncMode::Live
    } else {
        SyncMode::DryRun
    };
    let guard = SyncGuard::new(ledger, SystemClock::new());
    let result = guard.run_sync(candidates, &credential, mode).await;

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
    let audit_path = write_audit_csv(&result, &output_dir)?;

    tracing::info!(
        run_reference = %result.run_reference,
        total = result.total(),
        succeeded = result.succeeded,
        failed = result.failed,
        skipped = result.skipped,
        audit = %audit_path.display(),
        "run complete"
    );
    Ok(())
}

/// Obtain a fresh credential over the device flow.
async fn sign_in(
    config: &AppConfig,
    secrets: &Secrets,
) -> Result<Credential, Box<dyn std::error::Error>> {
    let identity = OAuthIdentityClient::new(IdentityEndpoints {
        token_url: config.identity.token_url.clone(),
        device_authorization_url: config.identity.device_authorization_url.clone(),
        userinfo_url: config.identity.userinfo_url.clone(),
        client_id: secrets.client_id.clone(),
        client_secret: secrets.client_secret.clone(),
        scopes: config.identity.scopes.clone(),
    });
    let codec = Arc::new(StateTokenCodec::new(
        secrets.state_signing_secret.as_bytes(),
    ));
    let redirect = RedirectConfig {
        authorize_url: Url::parse(&config.identity.authorize_url)?,
        client_id: secrets.client_id.clone(),
        redirect_uri: config.identity.redirect_uri.clone(),
        scopes: config.identity.scopes.clone(),
    };
    let mut flow =
        AuthorizationFlowController::new(identity, SystemClock::new(), codec, redirect);

    let challenge = flow.begin_device_flow().await?;
    println!(
        "To sign in, visit {} and enter code {}",
        challenge.verification_url, challenge.user_code
    );

    loop {
        tokio::time::sleep(Duration::from_secs(challenge.interval_secs)).await;
        if flow.poll_device().await?.is_complete() {
            break;
        }
    }

    Ok(flow.ensure_fresh().await?)
}
