//! Bulk thumbnail generation over directory trees.

mod stream;
mod walk;

pub use crate::scan::stream::{FileOutcome, ScanEvent};
pub(crate) use crate::scan::stream::scan;
use derive_more::Display;
use serde::Serialize;

/// Counters for one bulk generation run. Every run starts from zero.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize)]
#[display("scanned {scanned}, generated {generated}, skipped {skipped}, failed {failed}")]
pub struct GenerationStats {
    /// Supported media files found.
    pub scanned: u64,
    pub generated: u64,
    /// Already had a fresh thumbnail.
    pub skipped: u64,
    pub failed: u64,
}
impl GenerationStats {
    pub(crate) fn record(&mut self, outcome: FileOutcome) {
        self.scanned += 1;
        match outcome {
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Generated => self.generated += 1,
            FileOutcome::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut stats = GenerationStats::default();
        stats.record(FileOutcome::Generated);
        stats.record(FileOutcome::Skipped);
        stats.record(FileOutcome::Skipped);
        stats.record(FileOutcome::Failed);
        assert_eq!(stats, GenerationStats { scanned: 4, generated: 1, skipped: 2, failed: 1 });
        assert_eq!(stats.to_string(), "scanned 4, generated 1, skipped 2, failed 1");
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let stats = GenerationStats { scanned: 3, generated: 2, skipped: 1, failed: 0 };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json, serde_json::json!({"scanned": 3, "generated": 2, "skipped": 1, "failed": 0}));
    }
}
