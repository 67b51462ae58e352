use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api::{create_router, AppState};
use crate::config::{AppConfig, StoreBackend};
use crate::error::{Result, ServerError};
use crate::ml::InferenceService;

use super::{MemoryStore, PostgresStore};

/// Connect the configured store and assemble handler state.
pub async fn build_state(config: &AppConfig, inference: InferenceService) -> Result<AppState> {
    let policy = config.server.persist_policy;
    let state = match config.store.backend {
        StoreBackend::Postgres => {
            let url = config.store.url.as_deref().ok_or_else(|| {
                ServerError::InvalidConfig(vec![
                    "store.url is required for the postgres backend".to_string(),
                ])
            })?;
            let store = PostgresStore::new(url, config.store.max_connections).await?;
            if config.store.run_migrations {
                store.migrate().await?;
            }
            AppState::new(inference, Arc::new(store), policy)
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            AppState::new(inference, Arc::new(MemoryStore::new()), policy)
        }
    };
    Ok(state)
}

/// Start the API server and run until a shutdown signal arrives
pub async fn start_api_server(state: AppState, addr: &str) -> Result<()> {
    let policy = state.persist_policy;
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        persist_policy = policy.as_str(),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
