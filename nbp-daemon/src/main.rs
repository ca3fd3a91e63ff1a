//! NBP Daemon - KPI broadcaster for dashboards and lap timers
//!
//! Reads KPI snapshots as JSON lines on stdin and broadcasts them over every
//! configured transport (TCP, serial, Bluetooth RFCOMM).

use anyhow::{bail, Context, Result};
use clap::Parser;
use nbp_broadcaster::BroadcasterHandle;
use std::path::PathBuf;
use tracing::{error, info, warn, Level};

use nbp_daemon::config::DaemonConfig;
use nbp_daemon::ingest;

#[derive(Parser, Debug)]
#[command(name = "nbp-daemon", version, about = "Numeric Broadcast Protocol daemon")]
struct Args {
    /// Configuration file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DaemonConfig::load_from(path),
        None => DaemonConfig::load(),
    }
    .context("Failed to load configuration")?;

    let level_name = args.log_level.as_deref().unwrap_or(&config.log_level);
    let level: Level = level_name
        .parse()
        .with_context(|| format!("Invalid log level '{}'", level_name))?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting NBP daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config.config_path.display());

    if config.transports.is_empty() {
        bail!("No transports configured in {}", config.config_path.display());
    }

    let mut handles: Vec<BroadcasterHandle> = Vec::new();
    for transport in &config.transports {
        match nbp_broadcaster::start(&config.broadcaster, transport).await {
            Ok(handle) => {
                info!("Broadcasting on {}", transport.label());
                handles.push(handle);
            }
            Err(e) => error!("Failed to start {}: {}", transport.label(), e),
        }
    }

    if handles.is_empty() {
        bail!("No transport could be started");
    }

    info!(
        "Device '{}' ready, protocol {}, min update interval {}s",
        config.broadcaster.device_name,
        config.broadcaster.protocol_version,
        config.broadcaster.min_update_interval_s
    );

    let queues: Vec<_> = handles.iter().map(|h| h.sender()).collect();
    let input = ingest::spawn_pump(|| std::io::stdin().lock(), queues)?;

    tokio::select! {
        result = input => {
            match result {
                Ok(Ok(count)) => info!("Input closed after {} snapshots", count),
                Ok(Err(e)) => warn!("Input error: {:#}", e),
                Err(_) => error!("Input thread exited without reporting"),
            }
            for handle in handles {
                handle.close().await;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            for handle in handles {
                handle.shutdown().await;
            }
        }
    }

    info!("NBP daemon stopped");
    Ok(())
}
