//! Throughput Measurement Helper - Daemon
//!
//! Wires the control module to an event bus, loads configuration, and
//! handles process lifecycle. The bus is the module's only inbound
//! surface; transports feeding it live in the embedding framework.

#![forbid(unsafe_code)]

mod config;
mod module;
mod nodes;

use anyhow::Result;
use clap::Parser;
use module::ControlModule;
use std::path::PathBuf;
use tmh_common::{EventBus, LogConfig, init_logging};
use tracing::info;

#[derive(Parser)]
#[command(name = "tmhd")]
#[command(author, version, about = "TMH daemon - throughput measurement orchestration")]
struct Cli {
    /// Path to daemon configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the measurement executable path
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env("info");
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    init_logging(&log_config)?;

    info!("Starting TMH daemon...");

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(executable) = cli.executable {
        config.executable = executable;
    }
    info!("Measurement executable: {}", config.executable.display());

    let bus = EventBus::new(config.event_buffer);
    let module = ControlModule::new(&config, bus.clone());
    let inbound = module.subscribe();

    tokio::select! {
        _ = module.run(inbound) => {}
        _ = shutdown_signal() => info!("Shutdown signal received"),
    }

    module.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
