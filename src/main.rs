//! ==============================================================================
//! main.rs - sensor hub entry point
//! ==============================================================================
//!
//! purpose:
//!     runs one of two roles, picked by `cluster.role` in hub.toml:
//!
//!     - hub:  loads the snapshot, serves the api + dashboard, flushes the
//!             snapshot on ctrl-c / SIGTERM
//!     - node: samples a (mock) sensor and pushes readings to a hub
//!
//! relationships:
//!     - uses: config.rs (HubConfig), server.rs (Hub, serve), node.rs (run_node)
//!
//! ==============================================================================

use anyhow::{Context, Result};
use sensor_hub::config::{HubConfig, Role};
use sensor_hub::{node, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Sensor Hub - temperature / humidity telemetry");
    println!("===========================================================");

    // step 1: load configuration
    let config = HubConfig::load_or_default();
    init_logging(&config);
    config.print_summary();

    match config.cluster.role {
        Role::Node => node::run_node(&config).await,
        Role::Hub => run_hub(&config).await,
    }
}

async fn run_hub(config: &HubConfig) -> Result<()> {
    // step 2: hydrate the store from the last snapshot
    let hub = server::Hub::open(config);
    tracing::info!("[STARTUP] ✓ Store ready ({} readings)", hub.len().await);

    // step 3: serve until a shutdown signal, then flush
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("[STARTUP] ✓ Dashboard live at http://{}", addr);

    server::serve(listener, hub, server::shutdown_signal()).await?;
    tracing::info!("[SHUTDOWN] bye");
    Ok(())
}

/// RUST_LOG wins over logging.level
fn init_logging(config: &HubConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
