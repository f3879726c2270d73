//! Blue Moon Service - HTTP API for the residence backend
//!
//! This is the main entry point for the bluemoon service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bluemoon_engine::Engine;
use bluemoon_service::{create_router, open_store, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bluemoon=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Blue Moon Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        store_backend = %config.store_backend,
        data_dir = %config.data_dir,
        admin_configured = %config.admin_api_key.is_some(),
        callback_signed = %config.callback_secret.is_some(),
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    // Repair whatever a previous crash left half-written before taking traffic.
    let report = Engine::new(store.clone()).reconciler().rebuild()?;
    if !report.is_clean() {
        tracing::warn!(?report, "Startup reconciliation repaired derived indexes");
    }

    let state = AppState::new(store, config.clone());
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
