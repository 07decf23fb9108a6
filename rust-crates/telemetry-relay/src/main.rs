//! Telemetry relay daemon
//!
//! Accepts UI clients and the master link on separate TCP listeners and runs
//! until interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use telemetry_relay::{RelayConfig, RelayServer};

#[derive(Parser, Debug)]
#[command(name = "telemetry-relay", version, about = "Telemetry relay between UI clients and the master link")]
struct Args {
    /// Configuration file (default: <config dir>/telemetry-relay/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the UI listener address
    #[arg(long)]
    ui_addr: Option<String>,

    /// Override the master listener address
    #[arg(long)]
    master_addr: Option<String>,

    /// Fixed jitter seed for reproducible streams
    #[arg(long)]
    seed: Option<u64>,

    /// Start with an empty session registry
    #[arg(long)]
    no_demo_sessions: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .with_level(true)
        .init();

    info!("Starting telemetry relay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = RelayConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    info!("Configuration loaded from {}", config.config_path.display());

    if let Some(addr) = args.ui_addr {
        config.ui_addr = addr;
    }
    if let Some(addr) = args.master_addr {
        config.master_addr = addr;
    }
    if args.seed.is_some() {
        config.jitter_seed = args.seed;
    }
    if args.no_demo_sessions {
        config.seed_demo_sessions = false;
    }

    let server = RelayServer::bind(&config)
        .await
        .context("Failed to start listeners")?;

    info!("Relay ready");

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Relay stopped");
    Ok(())
}
