//! Rift simulator
//!
//! Usage:
//!   rift-simulator [--config simulator.yaml] [--control-addr 127.0.0.1:2525] [--data-addr 127.0.0.1:8080]

use anyhow::Context;
use clap::Parser;
use rift_simulator::{Config, ControlServer, DataServer, SimulationEngine};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Rift simulator - programmable HTTP mock server
#[derive(Parser, Debug)]
#[command(name = "rift-simulator")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "RIFT_SIMULATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Control API address (overrides the config file)
    #[arg(long, env = "RIFT_SIMULATOR_CONTROL_ADDR")]
    control_addr: Option<SocketAddr>,

    /// Data listener address (overrides the config file)
    #[arg(long, env = "RIFT_SIMULATOR_DATA_ADDR")]
    data_addr: Option<SocketAddr>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(addr) = args.control_addr {
        config.listen.control = addr;
    }
    if let Some(addr) = args.data_addr {
        config.listen.data = addr;
    }

    let engine = Arc::new(SimulationEngine::new());
    for simulation in config.simulations {
        let name = simulation.name.clone();
        if !engine.register(simulation) {
            warn!("Skipping duplicate simulation '{}' from config", name);
        }
    }

    let control = ControlServer::bind(config.listen.control, Arc::clone(&engine))
        .await
        .with_context(|| format!("Failed to bind control API on {}", config.listen.control))?;
    let data = DataServer::bind(config.listen.data, Arc::clone(&engine))
        .await
        .with_context(|| format!("Failed to bind data listener on {}", config.listen.data))?;

    info!(
        "Rift simulator v{} started with {} simulation(s)",
        env!("CARGO_PKG_VERSION"),
        engine.simulations().len()
    );

    tokio::select! {
        result = control.run() => result?,
        result = data.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
