//! Process configuration.
//!
//! Process-wide options come from CLI flags with environment fallbacks;
//! trackers come from `TRACKER_<NAME>_<OPTION>` variables (see [`trackers`]).

pub mod trackers;

pub use trackers::{load_trackers, TrackerConfig, TrackerKind};

use std::time::Duration;

use clap::Parser;

use crate::http_client::{resolve_user_agent, ProxyConfig};
use crate::scrapers::flaresolverr::DEFAULT_MAX_TIMEOUT_MS;

/// Default metrics port.
pub const DEFAULT_PORT: u16 = 9100;

/// Exporter settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "tracker-exporter", version, about = "Prometheus exporter for private tracker statistics")]
pub struct Settings {
    /// Address to bind the metrics server to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the metrics server.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// HTTP path serving the metrics.
    #[arg(long, env = "METRICS_PATH", default_value = "/metrics")]
    pub metrics_path: String,

    /// Minimum seconds between scrapes of all trackers.
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value_t = 300)]
    pub cache_ttl: u64,

    /// Outbound proxy for all tracker requests.
    #[arg(long, env = "PROXY_URL")]
    pub proxy_url: Option<String>,

    #[arg(long, env = "PROXY_USERNAME")]
    pub proxy_username: Option<String>,

    #[arg(long, env = "PROXY_PASSWORD", hide_env_values = true)]
    pub proxy_password: Option<String>,

    /// FlareSolverr endpoint (e.g. http://localhost:8191/v1).
    #[arg(long, env = "FLARESOLVERR_URL")]
    pub flaresolverr_url: Option<String>,

    /// FlareSolverr maxTimeout in milliseconds.
    #[arg(long, env = "FLARESOLVERR_TIMEOUT_MS", default_value_t = DEFAULT_MAX_TIMEOUT_MS)]
    pub flaresolverr_timeout_ms: u64,

    /// User agent override for tracker requests.
    #[arg(long, env = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Tracker request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = 30)]
    pub request_timeout: u64,

    /// Log level when RUST_LOG is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Settings {
    /// Outbound proxy, if one is configured.
    pub fn proxy(&self) -> Option<ProxyConfig> {
        let url = self.proxy_url.as_deref().filter(|u| !u.is_empty())?;
        let proxy = ProxyConfig::new(url);
        Some(match (&self.proxy_username, &self.proxy_password) {
            (Some(user), Some(pass)) => proxy.with_credentials(user, pass),
            _ => proxy,
        })
    }

    pub fn user_agent(&self) -> String {
        resolve_user_agent(self.user_agent.as_deref())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// Metrics path normalized to start with a slash.
    pub fn metrics_path(&self) -> String {
        if self.metrics_path.starts_with('/') {
            self.metrics_path.clone()
        } else {
            format!("/{}", self.metrics_path)
        }
    }
}
