//! FlareSolverr challenge solver client.
//!
//! When a tracker answers with a challenge page, the request is replayed
//! through a FlareSolverr instance, which renders the page in a real browser
//! and hands back the HTML along with the cookies it collected.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use super::cookies::parse_cookie_header;
use crate::http_client::ProxyConfig;

/// Default extra transport time on top of `maxTimeout` before giving up on the service.
const TRANSPORT_GRACE: Duration = Duration::from_secs(10);

/// Default solver timeout in milliseconds.
pub const DEFAULT_MAX_TIMEOUT_MS: u64 = 60_000;

/// Failure modes of a solve attempt.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The solver could not be reached or answered with a non-2xx status.
    #[error("FlareSolverr service error: {0}")]
    Service(String),
    /// The solver reported an error of its own.
    #[error("FlareSolverr failed: {0}")]
    Logic(String),
    /// The solver worked but the tracker still refused the request.
    #[error("Target site returned {0} after FlareSolverr attempt.")]
    TargetBlocked(u16),
    #[error("Malformed FlareSolverr response: {0}")]
    MalformedResponse(String),
}

/// Cookie as exchanged with FlareSolverr.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<f64>,
    #[serde(default, rename = "httpOnly", skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

impl SolverCookie {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: None,
            path: None,
            expiry: None,
            http_only: None,
            secure: None,
        }
    }
}

/// Rendered page and cookies returned by a successful solve.
#[derive(Debug, Clone)]
pub struct ChallengeSolution {
    pub html: String,
    pub status: u16,
    pub cookies: Vec<SolverCookie>,
}

impl ChallengeSolution {
    /// Cookie assignments in `(name, value)` form for merging.
    pub fn cookie_pairs(&self) -> Vec<(&str, &str)> {
        self.cookies
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveRequest<'a> {
    cmd: &'static str,
    url: &'a str,
    max_timeout: u64,
    cookies: Vec<SolverCookie>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<SolverProxy>,
}

#[derive(Debug, Serialize)]
struct SolverProxy {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SolveResponse {
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<Solution>,
}

#[derive(Debug, Deserialize)]
struct Solution {
    status: u16,
    #[serde(default)]
    response: String,
    #[serde(default)]
    cookies: Vec<SolverCookie>,
}

/// Client for a FlareSolverr `/v1` endpoint.
#[derive(Debug, Clone)]
pub struct FlareSolverrClient {
    client: Client,
    service_url: String,
    max_timeout_ms: u64,
    transport_timeout: Duration,
    proxy: Option<ProxyConfig>,
}

impl FlareSolverrClient {
    /// Create a client for `service_url`.
    ///
    /// The service is contacted directly; `proxy` is forwarded in the
    /// request payload so the solver's browser uses it.
    pub fn new(
        service_url: &str,
        max_timeout_ms: u64,
        proxy: Option<ProxyConfig>,
    ) -> Result<Self, SolverError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SolverError::Service(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            service_url: service_url.to_string(),
            max_timeout_ms,
            transport_timeout: Duration::from_millis(max_timeout_ms) + TRANSPORT_GRACE,
            proxy,
        })
    }

    /// Override how long to wait for the service itself to answer.
    /// Defaults to `maxTimeout` plus a grace period.
    pub fn with_transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout = timeout;
        self
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Ask the solver to fetch `target_url` with the given cookies.
    pub async fn solve(
        &self,
        target_url: &str,
        cookie_header: &str,
    ) -> Result<ChallengeSolution, SolverError> {
        info!(
            "Attempting to solve challenge for {} via {}",
            target_url, self.service_url
        );

        let result = self.solve_inner(target_url, cookie_header).await;
        if let Err(ref e) = result {
            error!("Error communicating with FlareSolverr: {}", e);
        }
        result
    }

    async fn solve_inner(
        &self,
        target_url: &str,
        cookie_header: &str,
    ) -> Result<ChallengeSolution, SolverError> {
        let payload = self.build_request(target_url, cookie_header);

        let response = self
            .client
            .post(&self.service_url)
            .timeout(self.transport_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SolverError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SolverError::Service(format!(
                "FlareSolverr service returned {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }

        let data: SolveResponse = response
            .json()
            .await
            .map_err(|e| SolverError::MalformedResponse(e.to_string()))?;

        if data.status == "error" {
            return Err(SolverError::Logic(data.message));
        }

        let solution = data.solution.ok_or_else(|| {
            SolverError::MalformedResponse(format!(
                "status '{}' without a solution",
                data.status
            ))
        })?;

        if solution.status >= 400 {
            return Err(SolverError::TargetBlocked(solution.status));
        }

        Ok(ChallengeSolution {
            html: solution.response,
            status: solution.status,
            cookies: solution.cookies,
        })
    }

    fn build_request<'a>(&self, target_url: &'a str, cookie_header: &str) -> SolveRequest<'a> {
        let cookies = parse_cookie_header(cookie_header)
            .iter()
            .map(|(name, value)| SolverCookie::new(name, value))
            .collect();

        SolveRequest {
            cmd: "request.get",
            url: target_url,
            max_timeout: self.max_timeout_ms,
            cookies,
            proxy: self.proxy.as_ref().map(|p| SolverProxy {
                url: proxy_url_with_credentials(p),
            }),
        }
    }
}

/// Proxy URL with basic-auth credentials embedded when both are present.
pub fn proxy_url_with_credentials(proxy: &ProxyConfig) -> String {
    let (Some(username), Some(password)) = (&proxy.username, &proxy.password) else {
        return proxy.url.clone();
    };

    match url::Url::parse(&proxy.url) {
        Ok(mut parsed) => {
            if parsed.set_username(username).is_err() || parsed.set_password(Some(password)).is_err()
            {
                warn!("Proxy URL {} cannot carry credentials", proxy.url);
                return proxy.url.clone();
            }
            parsed.to_string()
        }
        Err(e) => {
            warn!(
                "Failed to construct authenticated proxy URL for FlareSolverr: {}",
                e
            );
            proxy.url.clone()
        }
    }
}
