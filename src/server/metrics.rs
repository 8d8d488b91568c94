//! Prometheus exposition of tracker snapshots.

use std::collections::BTreeMap;

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use super::cache::TrackerSnapshot;

const LABEL: &str = "tracker";

/// Gauge name, help text and the value it reads from a snapshot.
type GaugeSpec = (&'static str, &'static str, fn(&TrackerSnapshot) -> Option<f64>);

const GAUGES: [GaugeSpec; 10] = [
    ("tracker_upload_bytes", "Total upload in bytes", |s| {
        s.stats.uploaded.map(|v| v as f64)
    }),
    ("tracker_download_bytes", "Total download in bytes", |s| {
        s.stats.downloaded.map(|v| v as f64)
    }),
    ("tracker_buffer_bytes", "Upload buffer in bytes", |s| {
        s.stats.buffer.map(|v| v as f64)
    }),
    ("tracker_ratio", "User ratio", |s| s.stats.ratio),
    ("tracker_bonus_points", "User bonus points", |s| s.stats.bonus),
    ("tracker_seeding_count", "Number of torrents seeding", |s| {
        s.stats.seeding.map(|v| v as f64)
    }),
    ("tracker_leeching_count", "Number of torrents leeching", |s| {
        s.stats.leeching.map(|v| v as f64)
    }),
    ("tracker_hit_and_runs_count", "Number of hit and runs", |s| {
        s.stats.hit_and_runs.map(|v| v as f64)
    }),
    (
        "tracker_up_status",
        "Status of the last scrape (1 = success, 0 = failure)",
        |s| Some(if s.up { 1.0 } else { 0.0 }),
    ),
    (
        "tracker_last_scrape_timestamp_seconds",
        "Unix time of the last successful scrape",
        |s| s.last_success.map(|t| t.timestamp() as f64),
    ),
];

/// Render snapshots in the Prometheus text format.
///
/// A fresh registry is built per call so gauges for absent fields never
/// linger from an earlier render.
pub fn render(snapshots: &BTreeMap<String, TrackerSnapshot>) -> Result<String, prometheus::Error> {
    let registry = Registry::new();

    for (name, help, value) in GAUGES {
        let gauge = GaugeVec::new(Opts::new(name, help), &[LABEL])?;
        for (tracker, snapshot) in snapshots {
            if let Some(v) = value(snapshot) {
                gauge.with_label_values(&[tracker.as_str()]).set(v);
            }
        }
        registry.register(Box::new(gauge))?;
    }

    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Content type of [`render`] output.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
