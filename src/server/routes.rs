//! Router configuration for the metrics server.

use axum::{routing::get, Router};

use super::handlers;
use super::AppState;

/// Create the router, serving metrics at `metrics_path`.
pub fn create_router(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(handlers::serve_metrics))
        .route("/health", get(handlers::health))
        .with_state(state)
}
