//! Cache Statistics
//!
//! Hit/miss and expiry counters for the in-memory engine.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated with relaxed atomics
#[derive(Debug, Default)]
pub(crate) struct Stats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    expired: AtomicU64,
    swept: AtomicU64,
}

impl Stats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// An expired entry removed by the operation that touched it
    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Entries removed by a full sweep
    pub fn record_swept(&self, count: u64) {
        if count > 0 {
            self.swept.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
            entries,
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    pub writes: u64,
    /// Expired entries purged lazily
    pub expired: u64,
    /// Expired entries purged by the background reaper
    pub swept: u64,
    /// Physical entries, including expired ones not yet purged
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`, zero before any read
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }

    /// Get a summary of the counters
    pub fn summary(&self) -> String {
        format!(
            "Entries: {} | Hits: {} | Misses: {} ({:.1}% hit rate) | Writes: {} | Expired: {} lazy, {} swept",
            self.entries,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.writes,
            self.expired,
            self.swept
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let stats = Stats::default();

        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_write();
        stats.record_expired();
        stats.record_swept(4);
        stats.record_swept(0);

        let snapshot = stats.snapshot(7);
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.writes, 1);
        assert_eq!(snapshot.expired, 1);
        assert_eq!(snapshot.swept, 4);
        assert_eq!(snapshot.entries, 7);
        assert!((snapshot.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert!(snapshot.summary().contains("75.0% hit rate"));
    }

    #[test]
    fn test_empty_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
