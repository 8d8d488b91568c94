//! Data models.

mod stats;

pub use stats::UserStats;
