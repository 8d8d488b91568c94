//! TTL-bounded cache of per-tracker statistics.
//!
//! Scraping a tracker is slow and rate-sensitive, so Prometheus scrapes are
//! served from the last completed refresh pass until the TTL expires.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::metrics;
use crate::models::UserStats;
use crate::scrapers::TrackerClient;

/// Default time between refresh passes (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Shortest accepted TTL; lower values are raised to this.
pub const MIN_TTL: Duration = Duration::from_secs(30);

/// Last known state of one tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSnapshot {
    pub stats: UserStats,
    pub up: bool,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
}

impl TrackerSnapshot {
    /// State before the first attempt: zeroed stats, down.
    fn initial() -> Self {
        Self {
            stats: UserStats::zeroed(),
            up: false,
            last_attempt: None,
            last_success: None,
        }
    }
}

type Snapshots = BTreeMap<String, TrackerSnapshot>;

/// Statistics cache shared by the HTTP handlers.
pub struct MetricsCache {
    clients: Vec<Box<dyn TrackerClient>>,
    ttl: Duration,
    /// Replaced as a whole at the end of each pass.
    snapshots: RwLock<Arc<Snapshots>>,
    /// Completion time of the last pass. Held for the duration of a pass.
    last_refresh: Mutex<Option<Instant>>,
}

impl MetricsCache {
    pub fn new(clients: Vec<Box<dyn TrackerClient>>, ttl: Duration) -> Self {
        let ttl = if ttl < MIN_TTL {
            warn!(
                "Cache TTL {}s is below the minimum, using {}s",
                ttl.as_secs(),
                MIN_TTL.as_secs()
            );
            MIN_TTL
        } else {
            ttl
        };

        let snapshots: Snapshots = clients
            .iter()
            .map(|client| (client.name().to_string(), TrackerSnapshot::initial()))
            .collect();

        Self {
            clients,
            ttl,
            snapshots: RwLock::new(Arc::new(snapshots)),
            last_refresh: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshots, keyed by tracker name.
    pub fn snapshots(&self) -> Arc<Snapshots> {
        match self.snapshots.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Query every tracker unless the last pass finished within the TTL.
    ///
    /// Concurrent callers wait for an in-flight pass and then see it as fresh.
    pub async fn refresh(&self) {
        let mut last_refresh = self.last_refresh.lock().await;
        if let Some(at) = *last_refresh {
            if at.elapsed() < self.ttl {
                debug!("Serving cached tracker stats");
                return;
            }
        }

        info!("Refreshing stats for {} tracker(s)", self.clients.len());
        let previous = self.snapshots();

        let results = join_all(self.clients.iter().map(|client| async move {
            let started = Utc::now();
            (client.name(), started, client.user_stats().await)
        }))
        .await;

        let mut next: Snapshots = (*previous).clone();
        for (name, attempted_at, result) in results {
            let snapshot = next
                .entry(name.to_string())
                .or_insert_with(TrackerSnapshot::initial);
            snapshot.last_attempt = Some(attempted_at);
            match result {
                Ok(stats) => {
                    debug!("Tracker {} is up ({} field(s))", name, stats.found_fields());
                    snapshot.stats = stats;
                    snapshot.up = true;
                    snapshot.last_success = Some(attempted_at);
                }
                Err(e) => {
                    warn!("Error fetching stats for {}: {}", name, e);
                    snapshot.up = false;
                }
            }
        }

        match self.snapshots.write() {
            Ok(mut guard) => *guard = Arc::new(next),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(next),
        }
        *last_refresh = Some(Instant::now());
    }

    /// Prometheus text exposition of the current snapshots.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        metrics::render(&self.snapshots())
    }
}
