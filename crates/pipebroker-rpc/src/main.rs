//! Broker host process.
//!
//! Creates one registry, wires the registration and query entry points to
//! the TCP JSON-RPC server, and runs until interrupted.

use anyhow::Result;
use clap::Parser;
use pipebroker_core::Registry;
use pipebroker_rpc::{BrokerServer, BrokerService};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pipebroker-rpc")]
#[command(about = "Named-resource broker for pipeline runners")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "7400")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting pipebroker");

    let registry = Arc::new(Registry::new());
    let service = Arc::new(BrokerService::new(registry));

    let mut handle = BrokerServer::start(service, &args.host, args.port).await?;
    info!("Ready on {}", handle.addr());

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");
    handle.shutdown();

    Ok(())
}
