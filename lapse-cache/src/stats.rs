//! Cache counters and statistics snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters, updated without taking the entry lock.
#[derive(Debug, Default)]
pub(crate) struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl CacheMetrics {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_entries: usize, expired_entries: usize) -> CacheStats {
        CacheStats {
            total_entries,
            expired_entries,
            valid_entries: total_entries.saturating_sub(expired_entries),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries physically present, fresh or stale
    pub total_entries: usize,
    /// Entries present but past their deadline
    pub expired_entries: usize,
    /// Entries that `get` would return
    pub valid_entries: usize,
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that found nothing or a stale entry
    pub misses: u64,
    /// Writes through any `set` variant
    pub inserts: u64,
    /// Entries removed by `prune`
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let metrics = CacheMetrics::default();
        assert_eq!(metrics.snapshot(0, 0).hit_rate(), 0.0);

        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        assert!((metrics.snapshot(0, 0).hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_counts() {
        let metrics = CacheMetrics::default();
        metrics.record_insert();
        metrics.record_evictions(4);

        let stats = metrics.snapshot(10, 3);
        assert_eq!(stats.valid_entries, 7);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.evictions, 4);

        metrics.reset();
        assert_eq!(metrics.snapshot(0, 0), CacheStats::default());
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CacheMetrics::default().snapshot(2, 1);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["valid_entries"], 1);
    }
}
