use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use noughts_server::config::Cli;
use noughts_server::hub::Hub;
use noughts_server::{ServerConfig, transport};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServerConfig::from(Cli::parse());
    config.validate().context("invalid configuration")?;

    let listener = transport::bind(&config)
        .await
        .context("failed to bind listener")?;
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!(
        addr = %local_addr,
        outbound_queue = config.outbound_queue_capacity,
        send_timeout = ?config.send_timeout,
        "noughts-server listening"
    );

    let hub = Arc::new(Hub::new(&config));
    transport::serve(listener, hub, &config, shutdown_signal())
        .await
        .context("server shutdown with error")?;

    info!("shutdown complete");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .try_init();
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
}
