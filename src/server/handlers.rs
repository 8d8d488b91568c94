//! HTTP request handlers for the metrics server.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::metrics;
use super::AppState;

/// Refresh stale stats, then expose every tracker's gauges.
pub async fn serve_metrics(State(state): State<AppState>) -> Response {
    state.cache.refresh().await;

    match state.cache.render() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics::content_type())], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Liveness check.
pub async fn health() -> &'static str {
    "ok"
}
