// API routes for the indexer

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::application::chain::ChainService;
use crate::domain::services::UtxoCache;
use crate::utils::metrics::PipelineMetrics;

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<PipelineMetrics>,
    pub cache: Arc<UtxoCache>,
    pub chain_service: Arc<ChainService>,
}

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "DEX Indexer",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/health",
            "/api/status",
            "/metrics",
        ]
    }))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Status endpoint: sync state, cache stats, pipeline counters
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let cache_stats = state.cache.stats();

    Json(json!({
        "synced": state.chain_service.get_is_synced(),
        "blocks_processed": state.metrics.blocks_processed(),
        "event_processing_failed": state.metrics.event_processing_failed(),
        "cache": {
            "size": cache_stats.size,
            "max_size": cache_stats.max_size,
            "utilization_percent": cache_stats.utilization_percent,
            "hit_rate_percent": state.metrics.cache_hit_rate(),
        },
    }))
}

/// Prometheus text endpoint
async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render_prometheus()
}
