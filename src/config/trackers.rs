//! Tracker definitions loaded from `TRACKER_<NAME>_<OPTION>` variables.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

const PREFIX: &str = "TRACKER_";

/// Acquisition strategy for a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerKind {
    /// UNIT3D JSON API.
    #[default]
    Unit3d,
    /// Authenticated profile page scraping.
    Scraping,
}

impl FromStr for TrackerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNIT3D" => Ok(TrackerKind::Unit3d),
            "SCRAPING" => Ok(TrackerKind::Scraping),
            other => Err(format!("unsupported tracker type: {}", other)),
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerKind::Unit3d => write!(f, "UNIT3D"),
            TrackerKind::Scraping => write!(f, "SCRAPING"),
        }
    }
}

/// One configured tracker account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub name: String,
    pub url: String,
    pub kind: TrackerKind,
    /// Raw `Cookie` header value.
    pub cookie: Option<String>,
    /// File holding the cookie; read at startup and rewritten on rotation.
    pub cookie_file: Option<PathBuf>,
    pub api_key: Option<String>,
    pub username: Option<String>,
}

impl TrackerConfig {
    pub fn scraping(name: &str, url: &str, cookie: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind: TrackerKind::Scraping,
            cookie: Some(cookie.to_string()),
            cookie_file: None,
            api_key: None,
            username: None,
        }
    }

    pub fn unit3d(name: &str, url: &str, username: &str, api_key: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind: TrackerKind::Unit3d,
            cookie: None,
            cookie_file: None,
            api_key: Some(api_key.to_string()),
            username: Some(username.to_string()),
        }
    }

    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }

    /// Names of required options that are missing for this tracker's kind.
    fn missing_options(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.is_empty() {
            missing.push("URL");
        }
        match self.kind {
            TrackerKind::Unit3d => {
                if self.api_key.is_none() {
                    missing.push("API_KEY");
                }
                if self.username.is_none() {
                    missing.push("USERNAME");
                }
            }
            TrackerKind::Scraping => {
                if self.cookie.is_none() && self.cookie_file.is_none() {
                    missing.push("COOKIE");
                }
            }
        }
        missing
    }
}

#[derive(Debug, Default)]
struct PartialTracker {
    url: Option<String>,
    kind: Option<String>,
    cookie: Option<String>,
    cookie_file: Option<String>,
    api_key: Option<String>,
    username: Option<String>,
}

/// Split `TRACKER_<NAME>_<OPTION>` into `(name, option)`.
///
/// Longer suffixes are checked first so `COOKIE_FILE` is not read as a
/// tracker named `X_COOKIE` with option `FILE`.
fn split_key(key: &str) -> Option<(&str, &'static str)> {
    const OPTIONS: [&str; 6] = ["COOKIE_FILE", "API_KEY", "USERNAME", "COOKIE", "TYPE", "URL"];
    let rest = key.strip_prefix(PREFIX)?;
    OPTIONS.iter().find_map(|option| {
        let name = rest.strip_suffix(option)?.strip_suffix('_')?;
        (!name.is_empty()).then_some((name, *option))
    })
}

/// Build tracker configurations from environment-style key/value pairs.
///
/// Incomplete entries and unsupported types are skipped with a warning.
/// The result is ordered by tracker name.
pub fn load_trackers<I, K, V>(vars: I) -> Vec<TrackerConfig>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut partials: BTreeMap<String, PartialTracker> = BTreeMap::new();

    for (key, value) in vars {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        let Some((name, option)) = split_key(key.as_ref()) else {
            continue;
        };
        let entry = partials.entry(name.to_string()).or_default();
        let value = Some(value.to_string());
        match option {
            "URL" => entry.url = value,
            "TYPE" => entry.kind = value,
            "COOKIE" => entry.cookie = value,
            "COOKIE_FILE" => entry.cookie_file = value,
            "API_KEY" => entry.api_key = value,
            "USERNAME" => entry.username = value,
            _ => {}
        }
    }

    partials
        .into_iter()
        .filter_map(|(name, partial)| finish(name, partial))
        .collect()
}

fn finish(name: String, partial: PartialTracker) -> Option<TrackerConfig> {
    let kind = match partial.kind.as_deref().map(TrackerKind::from_str) {
        None => TrackerKind::default(),
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            warn!("Skipping tracker {}: {}", name, e);
            return None;
        }
    };

    let url = partial.url.unwrap_or_default();
    if !url.is_empty() && url::Url::parse(&url).is_err() {
        warn!("Invalid URL for tracker {}: {}", name, url);
        return None;
    }

    let config = TrackerConfig {
        name,
        url,
        kind,
        cookie: partial.cookie,
        cookie_file: partial.cookie_file.map(PathBuf::from),
        api_key: partial.api_key,
        username: partial.username,
    };

    let missing = config.missing_options();
    if !missing.is_empty() {
        warn!(
            "Skipping incomplete configuration for tracker {}. Missing: {}",
            config.name,
            missing.join(", ")
        );
        return None;
    }

    Some(config)
}
