//! Tracker account statistics.

use serde::{Deserialize, Serialize};

/// Account statistics for a single tracker.
///
/// Every field is optional: `None` means the value could not be found,
/// which is different from a value of zero. Byte counts are always raw
/// bytes regardless of the unit the tracker displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub uploaded: Option<u64>,
    pub downloaded: Option<u64>,
    pub buffer: Option<u64>,
    pub ratio: Option<f64>,
    pub bonus: Option<f64>,
    pub seeding: Option<u64>,
    pub leeching: Option<u64>,
    pub hit_and_runs: Option<u64>,
}

impl UserStats {
    /// Record with every field present and set to zero.
    ///
    /// Used as the placeholder for trackers that have never been scraped
    /// successfully.
    pub fn zeroed() -> Self {
        Self {
            uploaded: Some(0),
            downloaded: Some(0),
            buffer: Some(0),
            ratio: Some(0.0),
            bonus: Some(0.0),
            seeding: Some(0),
            leeching: Some(0),
            hit_and_runs: Some(0),
        }
    }

    /// True when no field was found at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of fields that carry a value.
    pub fn found_fields(&self) -> usize {
        [
            self.uploaded.is_some(),
            self.downloaded.is_some(),
            self.buffer.is_some(),
            self.ratio.is_some(),
            self.bonus.is_some(),
            self.seeding.is_some(),
            self.leeching.is_some(),
            self.hit_and_runs.is_some(),
        ]
        .iter()
        .filter(|found| **found)
        .count()
    }
}
