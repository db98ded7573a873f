//! CLI entry point.
//!
//! Reads configuration, binds the listener and runs the proxy until
//! Ctrl-C.

mod parser;

use anyhow::Context;
use clap::Parser;
use fimgate_proxy::ProxyConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::parser::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.apply(ProxyConfig::from_env()?);

    let addr = cli.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        info!("Received Ctrl-C, shutting down");
        shutdown.cancel();
    });

    fimgate_proxy::serve(listener, config, cancel).await
}
