// GPA Ledger - Web Server

use anyhow::{Context, Result};
use std::sync::Arc;

use gpa_ledger::api::build_app;
use gpa_ledger::{telemetry, Config, Ledger, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    telemetry::init(config.log_json);

    let store = SqliteStore::open(&config.storage)?;
    tracing::info!(storage = ?config.storage, "database opened");

    let app = build_app(Ledger::new(Arc::new(store)));

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
