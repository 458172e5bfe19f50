//! Hexgrid broadcast server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`hexgrid-config.yaml` + environment)
//! 2. Initialize structured logging (tracing)
//! 3. Open the JSON cell store
//! 4. Build the broadcast hub and serve until `Ctrl-C`

use std::sync::Arc;

use hexgrid_server::{AppState, AuthGate, BroadcastHub, LoggingConfig, ServerConfig, start_server};
use hexgrid_store::JsonFileStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the store, or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = ServerConfig::load()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        host = %config.host,
        port = config.port,
        idle_timeout_secs = config.idle_timeout_secs,
        data_path = %config.data_path.display(),
        codec = %config.codec,
        "Configuration loaded"
    );

    // 3. Open the cell store.
    let store = Arc::new(JsonFileStore::open(&config.data_path).await?);

    // 4. Build the hub and serve.
    let hub = BroadcastHub::with_codec(
        store,
        AuthGate::new(config.master_key.clone()),
        config.codec,
    );
    let state = Arc::new(AppState::new(hub, config.idle_timeout()));
    start_server(&config, state).await?;

    info!("hexgrid-server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
