//! clauseguard-api - contract-analysis intake and entitlement service
//!
//! Authenticated callers upload a PDF contract and receive an executive
//! summary plus ranked risk clauses, behind a one-free-document paywall.
//! Subscription state arrives asynchronously on the billing webhook.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use clauseguard_api::analyze::OpenAiAnalyzer;
use clauseguard_api::billing::StripeCheckout;
use clauseguard_api::extract::PdfExtractor;
use clauseguard_api::identity::HttpIdentityProvider;
use clauseguard_api::{build_router, AppState, StateOptions};
use clauseguard_common::config::{CliOverrides, Config};
use clauseguard_common::db::init_database;

#[derive(Debug, Parser)]
#[command(name = "clauseguard-api", about = "Contract-analysis intake service")]
struct Args {
    /// Path to TOML config file
    #[arg(long, env = "CLAUSEGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, e.g. 127.0.0.1:5740
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database path
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting clauseguard-api v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = Config::load(&CliOverrides {
        bind_addr: args.bind,
        database_path: args.database,
        config_file: args.config,
    })?;

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path).await?;

    let identity = Arc::new(HttpIdentityProvider::new(&config.identity)?);
    let analyzer = Arc::new(OpenAiAnalyzer::new(&config.analysis)?);
    let checkout = Arc::new(StripeCheckout::new(&config.billing)?);

    let state = AppState::new(
        pool,
        identity,
        analyzer,
        Arc::new(PdfExtractor),
        checkout,
        StateOptions {
            webhook_secret: config.billing.webhook_secret.clone(),
            signature_tolerance_secs: config.billing.signature_tolerance_secs,
            analysis_max_retries: config.analysis.max_retries,
            max_upload_bytes: config.max_upload_bytes,
        },
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("clauseguard-api listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
