//! Main entry point for the chauffeur agent.
//!
//! Parses the CLI, loads (or creates) the TOML configuration, wires up
//! logging, and hands control to the connection manager. The process only
//! ends on the server's `exit` message or an operator signal.

use anyhow::Context;
use chauffeur_agent::connection::Client;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod config;

use cli::Args;
use config::AppConfig;

/// Initialize logging: RUST_LOG wins, the config level is the fallback.
fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_from_file(&args.config)
        .await
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    // CLI overrides
    if let Some(server) = args.server {
        config.server.address = server;
    }
    if let Some(name) = args.name {
        config.agent.name = name;
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("configuration validation failed: {e}"))?;

    setup_logging(&config.logging.level);

    info!("chauffeur starting");
    info!(
        "server: {} | agent: {} ({})",
        config.server.address, config.agent.name, config.agent.school
    );

    let client = Client::new(config.to_connect_config());
    client.run().await?;
    Ok(())
}
