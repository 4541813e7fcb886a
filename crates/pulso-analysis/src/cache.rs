//! Per-source analysis cache with a staleness window.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::AnalysisReport;

/// Re-analyze entries older than this.
pub const STALENESS_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct CacheEntry {
    report: AnalysisReport,
    analyzed_at: SystemTime,
}

/// Cache of analysis results keyed by source identity (typically the
/// track's path or content hash).
///
/// A hit short-circuits the full recomputation unless the entry has aged
/// past the staleness window; staleness is evaluated on lookup.
#[derive(Default)]
pub struct AnalysisCache {
    entries: HashMap<String, CacheEntry>,
}

impl AnalysisCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh cached report for a source, if any.
    pub fn get(&self, source: &str) -> Option<&AnalysisReport> {
        let entry = self.entries.get(source)?;
        let age = SystemTime::now()
            .duration_since(entry.analyzed_at)
            .unwrap_or(Duration::ZERO);
        if age > STALENESS_WINDOW {
            debug!(source, "cached analysis is stale");
            None
        } else {
            Some(&entry.report)
        }
    }

    /// Store a report for a source, stamping it now.
    pub fn insert(&mut self, source: impl Into<String>, report: AnalysisReport) {
        self.entries.insert(
            source.into(),
            CacheEntry {
                report,
                analyzed_at: SystemTime::now(),
            },
        );
    }

    /// Cached report or compute-and-store.
    pub fn get_or_insert_with(
        &mut self,
        source: &str,
        compute: impl FnOnce() -> AnalysisReport,
    ) -> &AnalysisReport {
        let fresh = self.get(source).is_some();
        if !fresh {
            let report = compute();
            self.insert(source, report);
        }
        &self.entries[source].report
    }

    /// Drop one source's entry. Returns `false` if absent.
    pub fn invalidate(&mut self, source: &str) -> bool {
        self.entries.remove(source).is_some()
    }

    /// Number of cached entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Backdate an entry, for staleness tests.
    #[cfg(test)]
    fn backdate(&mut self, source: &str, age: Duration) {
        if let Some(entry) = self.entries.get_mut(source) {
            entry.analyzed_at = SystemTime::now() - age;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_report(bpm: u32) -> AnalysisReport {
        AnalysisReport {
            bpm,
            ..AnalysisReport::default()
        }
    }

    #[test]
    fn hit_skips_recompute() {
        let mut cache = AnalysisCache::new();
        cache.insert("track.flac", dummy_report(128));

        let mut computed = false;
        let report = cache.get_or_insert_with("track.flac", || {
            computed = true;
            dummy_report(0)
        });
        assert_eq!(report.bpm, 128);
        assert!(!computed);
    }

    #[test]
    fn stale_entry_recomputes() {
        let mut cache = AnalysisCache::new();
        cache.insert("track.flac", dummy_report(128));
        cache.backdate("track.flac", STALENESS_WINDOW + Duration::from_secs(60));

        assert!(cache.get("track.flac").is_none());
        let report = cache.get_or_insert_with("track.flac", || dummy_report(140));
        assert_eq!(report.bpm, 140);
    }

    #[test]
    fn entry_just_inside_window_is_fresh() {
        let mut cache = AnalysisCache::new();
        cache.insert("track.flac", dummy_report(128));
        cache.backdate("track.flac", STALENESS_WINDOW - Duration::from_secs(60));
        assert!(cache.get("track.flac").is_some());
    }

    #[test]
    fn invalidate_removes() {
        let mut cache = AnalysisCache::new();
        cache.insert("a", dummy_report(1));
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert!(cache.is_empty());
    }
}
