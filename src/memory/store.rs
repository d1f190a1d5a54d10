//! TTL Store
//!
//! Sharded concurrent hashmap of entries carrying an absolute deadline.
//! Expired entries are purged lazily, by whichever read touches them first.

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

use super::stats::{CacheStats, Stats};

/// Entry in the store with value and expiration
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Bytes,
    /// `None` when `now + ttl` is beyond the clock's range
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Bytes, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    /// An entry is dead from its deadline on, so a zero TTL is already expired
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|t| now >= t).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Time left before the deadline
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.expires_at {
            Some(t) => t.saturating_duration_since(now),
            None => Duration::MAX,
        }
    }
}

enum Lookup {
    Live(Entry),
    Missing,
    Expired,
}

/// Dashmap picks `num_cpus * 4` rounded up to a power of two
pub fn default_shard_amount() -> usize {
    (num_cpus::get() * 4).next_power_of_two().max(2)
}

/// Concurrent key-value store with per-key deadlines
///
/// Each shard has its own lock, so every single-key operation is atomic
/// while operations on keys in different shards run in parallel. Cloning
/// shares the underlying map.
#[derive(Debug, Clone)]
pub struct TtlStore {
    inner: Arc<DashMap<String, Entry>>,
    stats: Arc<Stats>,
    shard_amount: usize,
}

impl Default for TtlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::with_shard_amount(default_shard_amount())
    }

    /// Create with specified shard count
    ///
    /// `shard_amount` must be a power of two greater than 1.
    pub fn with_shard_amount(shard_amount: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::with_shard_amount(shard_amount)),
            stats: Arc::new(Stats::default()),
            shard_amount,
        }
    }

    fn lookup(&self, key: &str) -> Lookup {
        let now = Instant::now();
        match self.inner.get(key) {
            None => {
                self.stats.record_miss();
                return Lookup::Missing;
            }
            Some(entry) if !entry.is_expired_at(now) => {
                self.stats.record_hit();
                return Lookup::Live(entry.value().clone());
            }
            Some(_) => {}
        }
        // The read guard is gone here; taking the shard write lock while
        // holding it would deadlock.
        self.stats.record_miss();
        self.purge(key);
        Lookup::Expired
    }

    /// Remove `key` only if it is still expired, so a concurrent `set` of a
    /// fresh entry survives.
    fn purge(&self, key: &str) -> bool {
        let purged = self
            .inner
            .remove_if(key, |_, entry| entry.is_expired())
            .is_some();
        if purged {
            self.stats.record_expired();
            trace!(key, "Purged expired key");
        }
        purged
    }

    /// Get value by key, returns None if key doesn't exist or is expired
    pub fn get(&self, key: &str) -> Option<Bytes> {
        match self.lookup(key) {
            Lookup::Live(entry) => Some(entry.value),
            Lookup::Missing | Lookup::Expired => None,
        }
    }

    /// Value and remaining TTL taken from one entry snapshot
    pub fn get_with_ttl(&self, key: &str) -> Option<(Bytes, Duration)> {
        match self.lookup(key) {
            Lookup::Live(entry) => {
                let remaining = entry.remaining(Instant::now());
                Some((entry.value, remaining))
            }
            Lookup::Missing | Lookup::Expired => None,
        }
    }

    /// Insert or overwrite, expiring `ttl` from now
    pub fn set(&self, key: &str, value: Bytes, ttl: Duration) {
        self.inner.insert(key.to_string(), Entry::new(value, ttl));
        self.stats.record_write();
    }

    /// Delete key, returns true if a live entry existed
    pub fn delete(&self, key: &str) -> bool {
        match self.inner.remove(key) {
            Some((_, entry)) if entry.is_expired() => {
                self.stats.record_expired();
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Move the deadline of a live entry to `ttl` from now
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        match self.inner.get_mut(key) {
            None => return false,
            Some(mut entry) => {
                if !entry.is_expired_at(now) {
                    entry.expires_at = now.checked_add(ttl);
                    return true;
                }
            }
        }
        self.purge(key);
        false
    }

    /// Remaining lifetime, zero if missing or expired
    pub fn ttl(&self, key: &str) -> Duration {
        self.get_with_ttl(key)
            .map(|(_, remaining)| remaining)
            .unwrap_or(Duration::ZERO)
    }

    /// Check if key exists and is not expired
    pub fn exists(&self, key: &str) -> bool {
        matches!(self.lookup(key), Lookup::Live(_))
    }

    /// Physical number of entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every expired entry, returns count of removed keys
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.inner.retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });
        self.stats.record_swept(removed as u64);
        removed
    }

    pub fn shard_amount(&self) -> usize {
        self.shard_amount
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_basic_operations() {
        let store = TtlStore::new();
        let value = Bytes::from_static(b"value");

        store.set("key", value.clone(), MINUTE);
        assert_eq!(store.get("key"), Some(value));
        assert!(store.exists("key"));

        assert!(store.delete("key"));
        assert!(!store.exists("key"));
        assert_eq!(store.get("key"), None);
        assert!(!store.delete("key"));
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let store = TtlStore::new();
        store.set("key", Bytes::from_static(b"value"), Duration::ZERO);

        // Still physically stored until a read touches it.
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key"), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_lazy_expiry_on_read() {
        let store = TtlStore::new();
        store.set("a", Bytes::from_static(b"1"), Duration::from_millis(20));
        store.set("b", Bytes::from_static(b"2"), Duration::from_millis(20));

        thread::sleep(Duration::from_millis(40));
        assert_eq!(store.len(), 2);

        assert!(!store.exists("a"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.ttl("b"), Duration::ZERO);
        assert!(store.is_empty());
        assert_eq!(store.stats().expired, 2);
    }

    #[test]
    fn test_delete_expired_reports_absent() {
        let store = TtlStore::new();
        store.set("key", Bytes::from_static(b"value"), Duration::ZERO);

        assert!(!store.delete("key"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_expire_extends_live_entry() {
        let store = TtlStore::new();
        let value = Bytes::from_static(b"value");
        store.set("key", value.clone(), Duration::from_millis(50));

        assert!(store.expire("key", MINUTE));
        let (stored, remaining) = store.get_with_ttl("key").unwrap();
        assert_eq!(stored, value);
        assert!(remaining > Duration::from_secs(59));
        assert!(remaining <= MINUTE);

        thread::sleep(Duration::from_millis(80));
        assert!(store.exists("key"));
    }

    #[test]
    fn test_expire_missing_or_expired() {
        let store = TtlStore::new();
        assert!(!store.expire("missing", MINUTE));

        store.set("key", Bytes::from_static(b"value"), Duration::ZERO);
        assert!(!store.expire("key", MINUTE));
        assert!(!store.exists("key"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let store = TtlStore::new();
        store.set("key", Bytes::from_static(b"value"), Duration::MAX);

        assert!(store.exists("key"));
        assert_eq!(store.ttl("key"), Duration::MAX);
    }

    #[test]
    fn test_purge_expired() {
        let store = TtlStore::with_shard_amount(4);

        for i in 0..10 {
            let key = format!("key{}", i);
            let value = Bytes::from(format!("value{}", i));
            store.set(&key, value, Duration::ZERO);
        }
        store.set("live", Bytes::from_static(b"live"), MINUTE);

        assert_eq!(store.purge_expired(), 10);
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().swept, 10);
        assert_eq!(store.shard_amount(), 4);
    }

    #[test]
    fn test_purge_spares_fresh_overwrite() {
        let store = TtlStore::new();
        store.set("key", Bytes::from_static(b"old"), Duration::ZERO);
        store.set("key", Bytes::from_static(b"new"), MINUTE);

        assert!(!store.purge("key"));
        assert_eq!(store.get("key"), Some(Bytes::from_static(b"new")));
    }

    #[test]
    fn test_concurrent_access() {
        let store = TtlStore::new();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let s = store.clone();
                thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("key-{}-{}", i, j);
                        let value = Bytes::from(format!("value-{}-{}", i, j));
                        s.set(&key, value.clone(), MINUTE);
                        assert_eq!(s.get(&key), Some(value));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 1000);
    }

    /// Writers race on one key, each pairing its value with a distinct TTL.
    /// A reader must never see one writer's value with another's deadline.
    #[test]
    fn test_no_torn_entries_under_contention() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let store = TtlStore::new();
        let handles: Vec<_> = (1..=8u64)
            .map(|writer| {
                let s = store.clone();
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(writer);
                    let ttl = Duration::from_secs(writer * 100);
                    for _ in 0..2_000 {
                        match rng.random_range(0..4) {
                            0 | 1 => s.set("shared", Bytes::from(writer.to_string()), ttl),
                            2 => {
                                s.delete("shared");
                            }
                            _ => {
                                if let Some((value, remaining)) = s.get_with_ttl("shared") {
                                    let owner: u64 =
                                        std::str::from_utf8(&value).unwrap().parse().unwrap();
                                    let owner_ttl = Duration::from_secs(owner * 100);
                                    assert!(remaining <= owner_ttl);
                                    assert!(remaining + Duration::from_secs(50) > owner_ttl);
                                }
                            }
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
    }
}
