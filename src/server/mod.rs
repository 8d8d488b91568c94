//! Metrics server.
//!
//! Serves the Prometheus exposition of every configured tracker. Each scrape
//! of the metrics path triggers a cache refresh, which only reaches the
//! trackers once the cache TTL has expired.

mod cache;
mod handlers;
mod metrics;
mod routes;

pub use cache::{MetricsCache, TrackerSnapshot, DEFAULT_TTL, MIN_TTL};
pub use metrics::render;
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MetricsCache>,
}

impl AppState {
    pub fn new(cache: MetricsCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

/// Start the metrics server and run until SIGINT or SIGTERM.
pub async fn serve(
    cache: MetricsCache,
    host: &str,
    port: u16,
    metrics_path: &str,
) -> anyhow::Result<()> {
    let app = create_router(AppState::new(cache), metrics_path);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Serving metrics at http://{}{}", addr, metrics_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::models::UserStats;
    use crate::scrapers::{ScrapeError, TrackerClient, TrackerError};

    struct StaticClient(&'static str, Option<UserStats>);

    #[async_trait]
    impl TrackerClient for StaticClient {
        fn name(&self) -> &str {
            self.0
        }

        async fn user_stats(&self) -> Result<UserStats, TrackerError> {
            self.1.ok_or_else(|| {
                ScrapeError::Blocked {
                    tracker: self.0.to_string(),
                    status: 503,
                    reason: "Service Unavailable".to_string(),
                }
                .into()
            })
        }
    }

    fn setup_test_app(metrics_path: &str) -> axum::Router {
        let clients: Vec<Box<dyn TrackerClient>> = vec![
            Box::new(StaticClient(
                "UP",
                Some(UserStats {
                    uploaded: Some(2048),
                    seeding: Some(7),
                    ..UserStats::default()
                }),
            )),
            Box::new(StaticClient("DOWN", None)),
        ];
        let cache = MetricsCache::new(clients, DEFAULT_TTL);
        create_router(AppState::new(cache), metrics_path)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = setup_test_app("/metrics");

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = body_string(response).await;
        assert!(body.contains("tracker_upload_bytes{tracker=\"UP\"} 2048"));
        assert!(body.contains("tracker_seeding_count{tracker=\"UP\"} 7"));
        assert!(body.contains("tracker_up_status{tracker=\"UP\"} 1"));
        assert!(body.contains("tracker_up_status{tracker=\"DOWN\"} 0"));
        assert!(body.contains("tracker_upload_bytes{tracker=\"DOWN\"} 0"));
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let app = setup_test_app("/stats");

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup_test_app("/metrics");

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }
}
