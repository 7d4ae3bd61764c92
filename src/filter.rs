//! Confidence filtering of extracted locations.

use crate::models::LocationRecord;

/// Records below this confidence never reach the geocoder.
pub const CONFIDENCE_THRESHOLD: f64 = 0.90;

pub fn is_confident(record: &LocationRecord) -> bool {
    record.confidence >= CONFIDENCE_THRESHOLD
}

/// Keep the records with `confidence >= 0.90`, preserving order.
pub fn retain_confident(records: Vec<LocationRecord>) -> Vec<LocationRecord> {
    records.into_iter().filter(is_confident).collect()
}
