//! Tracker clients.
//!
//! Two acquisition strategies share the [`TrackerClient`] trait:
//! - [`Unit3dClient`] reads the UNIT3D JSON API.
//! - [`ScrapingClient`] fetches the authenticated profile page, falls back to
//!   FlareSolverr when blocked, and extracts statistics heuristically.

pub mod cookie_store;
pub mod cookies;
pub mod extractor;
pub mod flaresolverr;
mod scraping;
mod unit3d;

pub use extractor::extract_user_stats;
pub use flaresolverr::{ChallengeSolution, FlareSolverrClient, SolverError};
pub use scraping::{ScrapeError, ScrapingClient};
pub use unit3d::{ApiError, Unit3dClient};

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::{TrackerConfig, TrackerKind};
use crate::models::UserStats;

/// Any failure fetching statistics for one tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Source of statistics for one tracker.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Tracker name used as the metric label.
    fn name(&self) -> &str;

    /// Fetch current account statistics.
    async fn user_stats(&self) -> Result<UserStats, TrackerError>;
}

/// Build the client matching a tracker's configured kind.
///
/// `http` is the shared outbound client; `solver` is only used by
/// scraping trackers.
pub fn create_tracker_client(
    config: TrackerConfig,
    http: Client,
    solver: Option<FlareSolverrClient>,
) -> Result<Box<dyn TrackerClient>, TrackerError> {
    match config.kind {
        TrackerKind::Scraping => Ok(Box::new(ScrapingClient::new(config, http, solver)?)),
        TrackerKind::Unit3d => Ok(Box::new(Unit3dClient::new(config, http)?)),
    }
}
