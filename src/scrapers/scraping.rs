//! Cookie-authenticated profile page scraping.

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::cookie_store::{load_cookie_file, save_cookie_file};
use super::cookies::{merge_cookie_pairs, merge_set_cookie_headers, parse_cookie_header};
use super::extractor::extract_user_stats;
use super::flaresolverr::{FlareSolverrClient, SolverError};
use super::{TrackerClient, TrackerError};
use crate::config::TrackerConfig;
use crate::models::UserStats;

/// Errors from the scraping pipeline.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Cookie is required for Scraping client (tracker: {0})")]
    MissingCookie(String),

    #[error("Failed to reach {tracker}: {source}")]
    Transport {
        tracker: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch page from {tracker}: {status} {reason}")]
    Blocked {
        tracker: String,
        status: u16,
        reason: String,
    },

    #[error("{blocked}; challenge solver also failed: {solver}")]
    ChallengeFailed {
        blocked: Box<ScrapeError>,
        #[source]
        solver: SolverError,
    },

    #[error("Failed to read page body from {tracker}: {source}")]
    Body {
        tracker: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Scraping client for trackers without an API.
///
/// The client owns the authoritative cookie for its tracker. Rotated
/// cookies from `Set-Cookie` or from the challenge solver replace it in
/// memory and are written to the configured cookie file.
pub struct ScrapingClient {
    config: TrackerConfig,
    http: Client,
    solver: Option<FlareSolverrClient>,
    /// Also serializes fetches for this tracker so rotations never race.
    cookie: Mutex<String>,
}

impl ScrapingClient {
    /// Create a client, loading the cookie from the cookie file when one is
    /// configured and readable; otherwise the inline cookie is used.
    pub fn new(
        config: TrackerConfig,
        http: Client,
        solver: Option<FlareSolverrClient>,
    ) -> Result<Self, ScrapeError> {
        let cookie = initial_cookie(&config)
            .ok_or_else(|| ScrapeError::MissingCookie(config.name.clone()))?;

        Ok(Self {
            config,
            http,
            solver,
            cookie: Mutex::new(cookie),
        })
    }

    /// Current cookie header value.
    pub async fn cookie(&self) -> String {
        self.cookie.lock().await.clone()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Fetch the profile page and extract statistics.
    pub async fn scrape(&self) -> Result<UserStats, ScrapeError> {
        let mut cookie = self.cookie.lock().await;
        let tracker = &self.config.name;
        let url = &self.config.url;

        debug!("Fetching stats page for {} from {}", tracker, url);

        let response = self
            .http
            .get(url)
            .header(COOKIE, cookie.as_str())
            .send()
            .await
            .map_err(|source| ScrapeError::Transport {
                tracker: tracker.clone(),
                source,
            })?;

        // Rotations must be kept even when the response is a block: the new
        // cookie is what unblocks the next attempt.
        let set_cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(str::to_string))
            .collect();
        let merged = merge_set_cookie_headers(&cookie, &set_cookies);
        self.store_cookie(&mut cookie, merged);

        let status = response.status();
        if !status.is_success() {
            let blocked = ScrapeError::Blocked {
                tracker: tracker.clone(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            };

            let Some(solver) = &self.solver else {
                return Err(blocked);
            };

            warn!("{}; retrying through FlareSolverr", blocked);
            return match solver.solve(url, &cookie).await {
                Ok(solution) => {
                    let merged = merge_cookie_pairs(&cookie, &solution.cookie_pairs());
                    self.store_cookie(&mut cookie, merged);
                    Ok(extract_user_stats(&solution.html))
                }
                Err(solver) => Err(ScrapeError::ChallengeFailed {
                    blocked: Box::new(blocked),
                    solver,
                }),
            };
        }

        let html = response.text().await.map_err(|source| ScrapeError::Body {
            tracker: tracker.clone(),
            source,
        })?;

        let stats = extract_user_stats(&html);
        debug!(
            "Extracted {} field(s) for {}: {:?}",
            stats.found_fields(),
            tracker,
            stats
        );
        Ok(stats)
    }

    /// Replace the held cookie and persist it when a value changed.
    /// Formatting differences alone (spacing, trailing `;`) are not a change.
    /// Persistence failures are logged; the in-memory value still updates.
    fn store_cookie(&self, current: &mut String, updated: String) {
        if parse_cookie_header(current) == parse_cookie_header(&updated) {
            return;
        }
        info!("Cookie rotated for {}", self.config.name);
        *current = updated;

        if let Some(path) = &self.config.cookie_file {
            if let Err(e) = save_cookie_file(path, current) {
                warn!("Could not persist rotated cookie for {}: {}", self.config.name, e);
            }
        }
    }
}

fn initial_cookie(config: &TrackerConfig) -> Option<String> {
    if let Some(path) = &config.cookie_file {
        match load_cookie_file(path) {
            Ok(Some(cookie)) => {
                debug!("Loaded cookie for {} from {}", config.name, path.display());
                return Some(cookie);
            }
            Ok(None) => debug!("Cookie file {} is empty", path.display()),
            Err(e) => debug!("{}; falling back to inline cookie", e),
        }
    }
    config.cookie.clone().filter(|c| !c.trim().is_empty())
}

#[async_trait]
impl TrackerClient for ScrapingClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn user_stats(&self) -> Result<UserStats, TrackerError> {
        Ok(self.scrape().await?)
    }
}
