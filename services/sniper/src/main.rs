//! Sniper CLI
//!
//! Command-line interface for the dedicated server availability sniper.

use std::path::PathBuf;

use clap::Parser;
use sniper::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "sniper")]
#[command(about = "Dedicated server availability monitor and auto-purchaser")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control API port (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, log_level={:?}",
        args.config,
        args.port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.resolve_secrets()?;

    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Starting sniper service");
    tracing::debug!(
        "Provider: {}, control API: {}, monitoring at boot: {}",
        config.provider.type_name(),
        if config.server.enabled { "enabled" } else { "disabled" },
        config.monitoring.is_some()
    );

    sniper::run(config).await?;

    Ok(())
}
