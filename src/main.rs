//! Station ledger API server.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http (axum) ──┬─ writes ─▶ TransactionPipeline ─┐
//!                            │             (nonce lock, sign,   │
//!                            │              submit, confirm)    ├─▶ ChainClient ──▶ node
//!                            └─ reads ──▶ LedgerQueries ────────┘
//!                                             │
//!                                      ContractBinding ◀── DeploymentCoordinator
//!                                                            (address file shared
//!                                                             by all replicas)
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use station_ledger::config::load_config;
use station_ledger::lifecycle::{bootstrap, spawn_seeding, Shutdown};
use station_ledger::observability::{logging, metrics};
use station_ledger::HttpServer;

#[derive(Parser)]
#[command(name = "station-ledger")]
#[command(about = "HTTP API over the fueling station ledger contract", long_about = None)]
struct Args {
    /// TOML configuration file; defaults plus environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "station-ledger starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rpc_url = %config.blockchain.rpc_url,
        chain_id = config.blockchain.chain_id,
        deployer = config.coordination.deployer,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = match bootstrap(&config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move { signal.trigger_on_signal().await });

    let seeding = spawn_seeding(&config, &app);

    let server = HttpServer::new(&config, app.state);
    server.run(listener, shutdown.subscribe()).await?;

    if let Some(task) = seeding {
        task.abort();
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
