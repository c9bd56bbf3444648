// Web server exposing health, status and metrics

use std::net::SocketAddr;

use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use log::{error, info};

use crate::config::AppConfig;

use super::routes::{create_router, AppState};

/// Start the web server
pub async fn start_server(config: &AppConfig, state: AppState) {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics.port));

    info!(
        "Starting metrics server on http://localhost:{}",
        config.metrics.port);

    if let Err(e) = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
    {
        error!("Metrics server failed: {}", e);
    }
}
