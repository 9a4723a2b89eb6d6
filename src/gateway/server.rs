//! HTTP server lifecycle

use super::handler::{app_router, AppState};
use crate::collab::Collaborators;
use crate::config::NotifierConfig;
use crate::digest::DigestFlusher;
use crate::error::{Error, Result};
use crate::notify::NotificationEngine;
use crate::outbox::OutboxStore;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Build the shared state from configuration: production collaborators
/// and the outbox at the configured directory.
pub async fn build_state(config: &NotifierConfig) -> Result<AppState> {
    let collab = Collaborators::from_config(config)?;
    let outbox = Arc::new(OutboxStore::new(config.outbox.dir.clone()).await?);
    tracing::info!(outbox = %outbox.base_dir().display(), "Outbox ready");

    Ok(AppState {
        engine: Arc::new(NotificationEngine::new(collab.clone(), outbox.clone())),
        flusher: Arc::new(DigestFlusher::new(collab, outbox)),
    })
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let address = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| Error::Config(format!("Failed to bind to {}: {}", address, e)))?;

    tracing::info!("Change notifier listening on {}", address);

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
