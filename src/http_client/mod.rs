//! Outbound HTTP client construction.
//!
//! One `reqwest::Client` is built at startup and shared by every tracker
//! client. It carries the user agent, timeout and the optional outbound
//! proxy, and owns the connection pool. Cookies are managed by the
//! scraping client itself, so no cookie store is enabled here.

mod user_agent;

pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::time::Duration;

use reqwest::{Client, Proxy};
use thiserror::Error;

/// Default request timeout for tracker requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("Invalid proxy URL '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to create HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Process-wide outbound proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy URL (`http://`, `https://`, `socks5://` or `socks5h://`).
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    fn to_reqwest(&self) -> Result<Proxy, ClientBuildError> {
        let proxy = Proxy::all(&self.url).map_err(|source| ClientBuildError::InvalidProxy {
            url: self.url.clone(),
            source,
        })?;
        Ok(match (&self.username, &self.password) {
            (Some(username), Some(password)) => proxy.basic_auth(username, password),
            _ => proxy,
        })
    }
}

/// Build the shared client used for all tracker requests.
pub fn build_outbound_client(
    user_agent: &str,
    timeout: Duration,
    proxy: Option<&ProxyConfig>,
) -> Result<Client, ClientBuildError> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        tracing::info!("Routing tracker requests through proxy {}", proxy.url);
        builder = builder.proxy(proxy.to_reqwest()?);
    }

    builder.build().map_err(ClientBuildError::Build)
}
