//! tracker-exporter binary.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracker_exporter::config::{load_trackers, Settings};
use tracker_exporter::http_client::build_outbound_client;
use tracker_exporter::scrapers::{create_tracker_client, FlareSolverrClient, TrackerClient};
use tracker_exporter::server::{self, MetricsCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let settings = Settings::parse();

    let default_filter = format!("tracker_exporter={}", settings.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let proxy = settings.proxy();
    let http = build_outbound_client(
        &settings.user_agent(),
        settings.request_timeout(),
        proxy.as_ref(),
    )
    .context("building outbound HTTP client")?;

    let solver = match settings.flaresolverr_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => {
            info!("Using FlareSolverr at {}", url);
            Some(
                FlareSolverrClient::new(url, settings.flaresolverr_timeout_ms, proxy.clone())
                    .context("building FlareSolverr client")?,
            )
        }
        None => None,
    };

    let mut clients: Vec<Box<dyn TrackerClient>> = Vec::new();
    for config in load_trackers(std::env::vars()) {
        let name = config.name.clone();
        let kind = config.kind;
        match create_tracker_client(config, http.clone(), solver.clone()) {
            Ok(client) => {
                info!("Configured {} tracker {}", kind, name);
                clients.push(client);
            }
            Err(e) => error!("Skipping tracker {}: {}", name, e),
        }
    }

    if clients.is_empty() {
        warn!("No trackers configured; set TRACKER_<NAME>_URL and its credentials");
    }

    let cache = MetricsCache::new(clients, settings.cache_ttl());
    server::serve(
        cache,
        &settings.host,
        settings.port,
        &settings.metrics_path(),
    )
    .await
}
