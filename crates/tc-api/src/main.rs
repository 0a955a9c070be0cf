//! # tc-api: Binary Entry Point
//!
//! Reads configuration from the environment, picks the ledger client and
//! the store backend, and serves on `0.0.0.0:$PORT`.

use anyhow::Context;
use tc_api::config::{AppConfig, LogFormat};
use tc_api::state::{AppState, Stores};
use tc_ledger::LedgerConfig;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("reading service configuration")?;
    init_tracing(config.log_format);
    tracing::debug!(?config, "configuration loaded");

    let ledger_config = LedgerConfig::from_env().context("reading ledger configuration")?;
    let ledger = tc_ledger::connect(&ledger_config).context("creating ledger client")?;

    let state = match &config.database_url {
        Some(url) => {
            let pool = tc_api::db::init_pool(url)
                .await
                .context("initializing database")?;
            AppState::from_ledger_config(ledger, Stores::postgres(pool.clone()), &ledger_config)
                .with_pool(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores; nothing survives a restart");
            AppState::from_ledger_config(ledger, Stores::in_memory(), &ledger_config)
        }
    };

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "TraceChain API listening");
    axum::serve(listener, tc_api::app(state)).await?;
    Ok(())
}
