//! HTTP handlers
//!
//! - POST /.mu/delta               process a change batch
//! - POST /flush?frequency=<f>     flush one batched frequency
//! - POST /flush/:frequency        same, frequency in the path
//! - GET  /health                  liveness check

use super::types::HealthResponse;
use crate::delta::ChangeBatch;
use crate::digest::{DigestFlusher, FlushReport};
use crate::error::{Error, Result};
use crate::notify::{BatchReport, NotificationEngine};
use crate::subscription::Frequency;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<NotificationEngine>,
    pub flusher: Arc<DigestFlusher>,
}

/// Create the router with all endpoints
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/.mu/delta", post(receive_delta))
        .route("/flush", post(flush_query))
        .route("/flush/:frequency", post(flush_path))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct FlushQuery {
    frequency: Option<String>,
}

fn parse_frequency(value: Option<&str>) -> Result<Frequency> {
    let value = value.ok_or_else(|| Error::InvalidInput("Missing frequency".to_string()))?;
    let frequency: Frequency = value.parse().map_err(Error::InvalidInput)?;
    if !frequency.is_batched() {
        return Err(Error::InvalidInput(format!(
            "Frequency must be one of daily, weekly, monthly (got {})",
            value
        )));
    }
    Ok(frequency)
}

/// POST /.mu/delta
async fn receive_delta(State(state): State<AppState>, body: Bytes) -> Result<Json<BatchReport>> {
    let batch = ChangeBatch::from_json(&body)?;
    tracing::debug!(
        change_sets = batch.iter().count(),
        statements = batch.statement_count(),
        "Received change batch"
    );
    let report = state.engine.process(&batch).await?;
    Ok(Json(report))
}

/// POST /flush?frequency=
async fn flush_query(
    State(state): State<AppState>,
    Query(params): Query<FlushQuery>,
) -> Result<Json<FlushReport>> {
    let frequency = parse_frequency(params.frequency.as_deref())?;
    Ok(Json(state.flusher.flush(frequency).await?))
}

/// POST /flush/:frequency
async fn flush_path(
    State(state): State<AppState>,
    Path(frequency): Path<String>,
) -> Result<Json<FlushReport>> {
    let frequency = parse_frequency(Some(&frequency))?;
    Ok(Json(state.flusher.flush(frequency).await?))
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
