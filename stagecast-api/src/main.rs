//! Stagecast server binary: config, logging, engine wiring, HTTP listener.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use stagecast_api::http::{create_router, AppState};
use stagecast_core::{logging, Config};

#[derive(Debug, Parser)]
#[command(name = "stagecast", about = "Real-time room broadcast engine", version)]
struct Cli {
    /// Path to a configuration file (TOML/YAML/JSON); environment variables
    /// with the STAGECAST_ prefix override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 127.0.0.1:9090
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    let state = AppState::from_config(&config);
    let sweeper = state.start_sweeper(&config);

    let addr = cli
        .listen
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.http_port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Stagecast listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
