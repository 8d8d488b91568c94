//! UNIT3D JSON API client.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::extractor::{parse_number, parse_size_str};
use super::{TrackerClient, TrackerError};
use crate::config::TrackerConfig;
use crate::models::UserStats;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("UNIT3D tracker {0} requires both an API key and a username")]
    MissingCredentials(String),

    #[error("Failed to reach {tracker}: {source}")]
    Transport {
        tracker: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch stats from {tracker}: {status} {reason}")]
    Status {
        tracker: String,
        status: u16,
        reason: String,
    },

    #[error("Invalid API response from {tracker}: {source}")]
    Decode {
        tracker: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Client for trackers running UNIT3D.
pub struct Unit3dClient {
    config: TrackerConfig,
    http: Client,
    api_key: String,
    username: String,
}

impl Unit3dClient {
    pub fn new(config: TrackerConfig, http: Client) -> Result<Self, ApiError> {
        let (Some(api_key), Some(username)) = (config.api_key.clone(), config.username.clone())
        else {
            return Err(ApiError::MissingCredentials(config.name.clone()));
        };
        Ok(Self {
            config,
            http,
            api_key,
            username,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/users/{}",
            self.config.url.trim_end_matches('/'),
            self.username
        )
    }

    pub async fn fetch(&self) -> Result<UserStats, ApiError> {
        let tracker = &self.config.name;
        let url = self.endpoint();
        debug!("Fetching UNIT3D stats for {} from {}", tracker, url);

        let response = self
            .http
            .get(&url)
            .query(&[("api_token", self.api_key.as_str())])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                tracker: tracker.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                tracker: tracker.clone(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body: Value = response.json().await.map_err(|source| ApiError::Decode {
            tracker: tracker.clone(),
            source,
        })?;

        Ok(stats_from_json(&body))
    }
}

/// Map a UNIT3D user payload to statistics.
///
/// Attributes live under `data` on most versions and at the root on some.
pub fn stats_from_json(body: &Value) -> UserStats {
    let empty = Map::new();
    let attrs = body
        .get("data")
        .and_then(Value::as_object)
        .or_else(|| body.as_object())
        .unwrap_or(&empty);

    UserStats {
        uploaded: attrs.get("uploaded").and_then(bytes_value),
        downloaded: attrs.get("downloaded").and_then(bytes_value),
        buffer: attrs.get("buffer").and_then(bytes_value),
        ratio: attrs.get("ratio").and_then(float_value),
        bonus: first_present(attrs, &["bonus_points", "seedbonus", "seed_bonus"])
            .and_then(float_value),
        seeding: first_present(attrs, &["seeding", "torrents_seeding_count", "seeding_count"])
            .and_then(count_value),
        leeching: attrs.get("leeching").and_then(count_value),
        hit_and_runs: attrs.get("hit_and_runs").and_then(count_value),
    }
}

fn first_present<'a>(attrs: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| attrs.get(*key))
        .find(|value| !value.is_null())
}

fn float_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn bytes_value(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => parse_size_str(s).or_else(|| float_value(value).map(to_count)),
        _ => float_value(value).map(to_count),
    }
}

fn count_value(value: &Value) -> Option<u64> {
    float_value(value).map(to_count)
}

fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

#[async_trait]
impl TrackerClient for Unit3dClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn user_stats(&self) -> Result<UserStats, TrackerError> {
        Ok(self.fetch().await?)
    }
}
