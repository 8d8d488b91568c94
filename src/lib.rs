//! Prometheus exporter for private BitTorrent tracker account statistics.
//!
//! Trackers running UNIT3D are read through their JSON API. Other trackers
//! are scraped: the authenticated profile page is fetched with a replayed
//! cookie, anti-bot challenges are delegated to FlareSolverr, rotated
//! cookies are persisted, and statistics are extracted heuristically from
//! the HTML.

pub mod config;
pub mod http_client;
pub mod models;
pub mod scrapers;
pub mod server;
