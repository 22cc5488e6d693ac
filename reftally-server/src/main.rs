//! Referee Tally Server - Main entry point
//!
//! Live scoring service for click-counter competitions. Bridges counter
//! devices to score aggregation, per-event CSV logging, and an HTTP
//! REST + SSE surface for scoreboard frontends.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reftally_common::config::{self, DEFAULT_PORT};
use reftally_common::events::EventBus;
use reftally_common::protocol::DEVICE_NAME_PREFIX;
use reftally_server::context::ScoringContext;
use reftally_server::device::SimHub;
use reftally_server::storage::EventLogWriter;
use reftally_server::{build_router, AppState};

/// Broadcast capacity for the SSE event bus
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for reftally-server
#[derive(Parser, Debug)]
#[command(name = "reftally-server")]
#[command(about = "Live scoring server for click-counter competitions")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "REFTALLY_PORT")]
    port: Option<u16>,

    /// Directory for per-event CSV score logs
    #[arg(short, long, env = "REFTALLY_DATA_DIR")]
    data_dir: Option<String>,

    /// Simulated counter device to register (repeatable)
    #[arg(long = "device", value_name = "NAME")]
    devices: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reftally_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let file_config = config::load_file_config();
    let port = args.port.or(file_config.port).unwrap_or(DEFAULT_PORT);
    let data_dir = config::resolve_data_dir(args.data_dir.as_deref(), &file_config);

    info!("Starting Referee Tally Server on port {}", port);
    info!("Data directory: {}", data_dir.display());

    // Register simulated counters; frontends discover them via GET /scan.
    let hub = Arc::new(SimHub::new());
    let device_names = if args.devices.is_empty() {
        vec![
            format!("{DEVICE_NAME_PREFIX}A"),
            format!("{DEVICE_NAME_PREFIX}B"),
        ]
    } else {
        args.devices.clone()
    };
    for name in &device_names {
        if !name.starts_with(DEVICE_NAME_PREFIX) {
            warn!(
                "Device name {} is outside the {}* advertising convention",
                name, DEVICE_NAME_PREFIX
            );
        }
        hub.register(name);
        info!("Registered device: {}", name);
    }

    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    let writer = EventLogWriter::new(data_dir);
    let ctx = Arc::new(ScoringContext::new(hub, bus, writer));

    let app = build_router(AppState { ctx: ctx.clone() });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Disconnect devices and stop aggregators before exiting.
    ctx.teardown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
