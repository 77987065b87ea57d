pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod telemetry;

pub use error::{ApiError, ErrorResponse};
pub use middleware::ApiKeys;
pub use rest::build_router;
pub use state::AppState;

use axum::Router;
use gatelog_core::{CoreError, CoreResult, GatelogConfig, MatcherCache};
use gatelog_storage::{default_index_schema, load_index_schema, AuditStore};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Open the audit store described by `config`, provisioning its index if needed.
pub async fn open_store(config: &GatelogConfig) -> CoreResult<AuditStore> {
    let schema = match &config.logs.schema_path {
        Some(path) => load_index_schema(path).await?,
        None => default_index_schema(),
    };

    AuditStore::connect(
        &config.logs.url,
        config.logs.index.clone(),
        &schema,
        config.logs.request_timeout(),
    )
    .await
}

/// Boots the Gatelog API server.
pub async fn run_server() -> CoreResult<()> {
    let config = GatelogConfig::load()
        .map_err(|e| CoreError::internal(format!("Invalid configuration: {}", e)))?;

    let api_keys = ApiKeys::from_config(&config.auth.keys);
    if api_keys.is_empty() {
        return Err(CoreError::internal(
            "No API keys configured. Add at least one entry under auth.keys",
        ));
    }
    info!("Loaded {} API keys", api_keys.len());

    info!(
        "Initializing audit store: url={}, index={}",
        config.logs.url, config.logs.index
    );
    let store = open_store(&config).await?;

    let state = AppState::new(
        store,
        MatcherCache::new(config.gate.pattern_cache_capacity),
        config.logs.default_size,
    );
    let app = build_router(state, Router::new(), Some(api_keys));

    let addr: SocketAddr = config.server.bind_address.parse().map_err(|e| {
        CoreError::internal(format!(
            "Invalid bind address '{}': {}",
            config.server.bind_address, e
        ))
    })?;

    info!("Starting Gatelog API server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CoreError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CoreError::internal(format!("Server error: {}", e)))?;

    info!("Gatelog API server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
    }
}
