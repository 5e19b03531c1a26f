//! pagecredits service - HTTP API for the credit ledger
//!
//! This is the main entry point for the pagecredits service.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagecredits_service::{create_router, AppState, ServiceConfig};
use pagecredits_store::{CreditStore, PgStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pagecredits=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pagecredits service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        postgres_configured = %config.database_url.is_some(),
        public_rate_limit = config.public_rate_limit,
        rate_limit_reset_seconds = config.rate_limit_reset_seconds,
        max_cas_attempts = config.max_cas_attempts,
        store_timeout_ms = config.store_timeout_ms,
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;

    // Build app state
    let state = AppState::new(store, config.clone());
    let rate_limiter = Arc::clone(&state.rate_limiter);

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    rate_limiter.destroy();
    tracing::info!("Server stopped");

    Ok(())
}

/// Pick the storage backend from configuration.
async fn open_store(
    config: &ServiceConfig,
) -> Result<Arc<dyn CreditStore>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.database_url {
        tracing::info!(
            max_connections = config.database_max_connections,
            "Connecting to PostgreSQL store"
        );
        let store = PgStore::connect(url, config.database_max_connections).await?;
        store.migrate().await?;
        tracing::info!("Database migrations applied");
        return Ok(Arc::new(store));
    }

    #[cfg(feature = "rocksdb-backend")]
    {
        tracing::info!(path = %config.data_dir, "Opening RocksDB store");
        let store = pagecredits_store::RocksStore::open(&config.data_dir)?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "rocksdb-backend"))]
    {
        tracing::warn!(
            "DATABASE_URL not set - using in-memory store, balances are lost on restart"
        );
        Ok(Arc::new(pagecredits_store::MemoryStore::new()))
    }
}

/// Resolve on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
