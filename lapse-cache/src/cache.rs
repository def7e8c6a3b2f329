//! In-memory TTL cache.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace};

use lapse_core::constants::FAR_FUTURE;
use lapse_core::{Clock, SystemClock};

use crate::config::CacheConfig;
use crate::stats::{CacheMetrics, CacheStats};

/// Cache entry with an absolute deadline.
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn with_ttl(value: V, now: Instant, ttl: Duration) -> Self {
        // Clamped so the addition cannot overflow; failure would need an
        // Instant near the platform maximum.
        let expires_at = now.checked_add(ttl.min(FAR_FUTURE)).unwrap_or(now);
        Self::with_deadline(value, now, expires_at)
    }

    fn with_deadline(value: V, now: Instant, expires_at: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
            expires_at,
        }
    }

    /// An entry whose deadline is not after its insertion never was fresh,
    /// even at the insertion instant itself.
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > self.inserted_at && now <= self.expires_at
    }
}

/// Thread-safe in-memory cache with per-entry expiration.
///
/// Reads (`get`, `contains_key`, `time_to_live`, `stats`) share a read lock.
/// Writes (`set*`, `remove`, `clear`, `prune`) take the write lock.
///
/// # Expiration
///
/// A stale entry is invisible to every read but stays in memory until
/// [`prune`](Self::prune) runs; `get` never deletes. Run `prune` yourself or
/// hand the cache to a [`Sweeper`](crate::Sweeper).
pub struct TtlCache<K, V, C = SystemClock> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    config: CacheConfig,
    clock: C,
    metrics: CacheMetrics,
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + Hash,
{
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash,
    C: Clock,
{
    /// Creates a cache that reads time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
            config,
            clock,
            metrics: CacheMetrics::default(),
        }
    }

    /// Caches a value with the configured default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.config.default_ttl());
    }

    /// Caches a value that expires `ttl` from now.
    ///
    /// Replaces any existing entry for `key`, fresh or stale. A zero `ttl`
    /// stores an entry that is already stale.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.write();
        let now = self.clock.now();
        entries.insert(key, CacheEntry::with_ttl(value, now, ttl));
        self.metrics.record_insert();
    }

    /// Caches a value that expires at `deadline`.
    ///
    /// A deadline at or before now stores an entry that is already stale.
    pub fn set_until(&self, key: K, value: V, deadline: Instant) {
        let mut entries = self.entries.write();
        let now = self.clock.now();
        entries.insert(key, CacheEntry::with_deadline(value, now, deadline));
        self.metrics.record_insert();
    }

    /// Gets a clone of the cached value.
    ///
    /// Returns `None` if the key is absent or its entry is stale.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Applies `f` to the cached value without cloning it.
    ///
    /// `f` runs under the read lock; keep it short and never touch the
    /// cache from inside it.
    pub fn get_with<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> R,
    {
        let entries = self.entries.read();
        let now = self.clock.now();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                self.metrics.record_hit();
                Some(f(&entry.value))
            }
            _ => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Returns true if a fresh entry exists for `key`.
    ///
    /// Does not count as a lookup in the statistics.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|e| e.is_fresh(now))
    }

    /// Remaining lifetime of a fresh entry.
    pub fn time_to_live<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .filter(|e| e.is_fresh(now))
            .map(|e| e.expires_at.saturating_duration_since(now))
    }

    /// Removes an entry, returning its value if it was still fresh.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.entries.write();
        let now = self.clock.now();
        entries
            .remove(key)
            .filter(|e| e.is_fresh(now))
            .map(|e| e.value)
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes all stale entries and returns how many were removed.
    ///
    /// The cut-off instant is read after the write lock is taken, so a
    /// concurrent overwrite is judged by its own deadline, never the one it
    /// replaced.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.write();
        let now = self.clock.now();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(now));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.metrics.record_evictions(removed);
            debug!(removed, remaining = before - removed, "Pruned expired entries");
        } else {
            trace!(entries = before, "Prune found nothing to remove");
        }
        removed
    }

    /// Returns the number of stored entries, including stale ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let now = self.clock.now();
        let expired = entries.values().filter(|e| !e.is_fresh(now)).count();
        self.metrics.snapshot(entries.len(), expired)
    }

    /// Zeroes the hit, miss, insert and eviction counters.
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    /// Returns the configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the clock this cache reads time from.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<K, V> Default for TtlCache<K, V, SystemClock>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> fmt::Debug for TtlCache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.read().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_core::ManualClock;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use test_case::test_case;

    fn manual_cache() -> (TtlCache<String, String, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock(CacheConfig::default(), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_cache_set_get() {
        let cache: TtlCache<String, String> = TtlCache::new();
        cache.set("alice".into(), "x".into());
        assert_eq!(cache.get("alice"), Some("x".to_string()));
    }

    #[test]
    fn test_cache_miss() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        assert!(cache.get("nonexistent").is_none());
    }

    #[test]
    fn test_empty_cache_is_safe() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        assert_eq!(cache.prune(), 0);
        assert_eq!(cache.get("anything"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_default_ttl_applies() {
        let (cache, clock) = manual_cache();
        cache.set("a".into(), "x".into());

        clock.advance(Duration::from_secs(299));
        assert!(cache.get("a").is_some());
        clock.advance(Duration::from_secs(2));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_time_travel() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("a".into(), "x".into(), Duration::from_millis(100));

        clock.advance(Duration::from_millis(50));
        assert_eq!(cache.get("a"), Some("x".to_string()));

        clock.advance(Duration::from_millis(100));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("a".into(), "x".into(), Duration::from_millis(100));

        clock.advance(Duration::from_millis(100));
        assert!(cache.get("a").is_some());
        clock.advance(Duration::from_nanos(1));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_zero_ttl_is_stale_immediately() {
        let (cache, _clock) = manual_cache();
        cache.set_with_ttl("a".into(), "x".into(), Duration::ZERO);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.prune(), 1);
    }

    #[test]
    fn test_past_deadline_is_stale() {
        let (cache, clock) = manual_cache();
        clock.advance(Duration::from_secs(10));
        let past = clock.now() - Duration::from_secs(1);
        cache.set_until("a".into(), "x".into(), past);
        assert_eq!(cache.get("a"), None);

        cache.set_until("b".into(), "y".into(), clock.now());
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("a".into(), "x".into(), Duration::MAX);
        clock.advance(Duration::from_secs(60 * 60 * 24 * 365));
        assert!(cache.get("a").is_some());
    }

    #[test_case(1 ; "one milli")]
    #[test_case(100 ; "hundred millis")]
    #[test_case(3_600_000 ; "one hour")]
    fn test_expires_exactly_after_ttl(ttl_ms: u64) {
        let (cache, clock) = manual_cache();
        let ttl = Duration::from_millis(ttl_ms);
        cache.set_with_ttl("k".into(), "v".into(), ttl);

        clock.advance(ttl);
        assert!(cache.contains_key("k"));
        clock.advance(Duration::from_millis(1));
        assert!(!cache.contains_key("k"));
    }

    #[test]
    fn test_prune_keeps_fresh_entries() {
        let (cache, clock) = manual_cache();
        clock.advance(Duration::from_secs(10));
        let now = clock.now();
        cache.set_until("a".into(), "fresh".into(), now + Duration::from_secs(3600));
        cache.set_until("b".into(), "stale".into(), now - Duration::from_secs(1));

        assert_eq!(cache.prune(), 1);
        assert_eq!(cache.get("a"), Some("fresh".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_prune_idempotent() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("short".into(), "x".into(), Duration::from_secs(1));
        cache.set_with_ttl("long".into(), "y".into(), Duration::from_secs(60));
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.prune(), 1);
        assert_eq!(cache.prune(), 0);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("long"));
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let (cache, _clock) = manual_cache();
        cache.set_with_ttl("k".into(), "v1".into(), Duration::from_secs(10));
        cache.set_with_ttl("k".into(), "v2".into(), Duration::from_secs(20));
        assert_eq!(cache.get("k"), Some("v2".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_resets_deadline() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("k".into(), "v1".into(), Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));
        cache.set_with_ttl("k".into(), "v2".into(), Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn test_overwrite_revives_stale_key() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("k".into(), "old".into(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(5));
        assert!(cache.get("k").is_none());

        cache.set_with_ttl("k".into(), "new".into(), Duration::from_secs(1));
        assert_eq!(cache.get("k"), Some("new".to_string()));
        assert_eq!(cache.prune(), 0);
    }

    #[test]
    fn test_get_does_not_delete_stale() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("k".into(), "v".into(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expired_entries, 1);
    }

    #[test]
    fn test_cache_remove() {
        let (cache, clock) = manual_cache();
        cache.set("a".into(), "x".into());
        assert_eq!(cache.remove("a"), Some("x".to_string()));
        assert!(cache.get("a").is_none());

        cache.set_with_ttl("b".into(), "y".into(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.remove("b"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_clear() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        cache.set("alice".into(), 1);
        cache.set("bob".into(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_time_to_live() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("k".into(), "v".into(), Duration::from_secs(30));
        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.time_to_live("k"), Some(Duration::from_secs(20)));

        clock.advance(Duration::from_secs(21));
        assert_eq!(cache.time_to_live("k"), None);
        assert_eq!(cache.time_to_live("missing"), None);
    }

    #[test]
    fn test_get_with_avoids_clone() {
        let cache: TtlCache<u64, Vec<u8>> = TtlCache::new();
        cache.set(7, vec![1, 2, 3]);
        assert_eq!(cache.get_with(&7u64, |v| v.len()), Some(3));
        assert_eq!(cache.get_with(&8u64, |v| v.len()), None);
    }

    #[test]
    fn test_cache_stats() {
        let (cache, clock) = manual_cache();
        cache.set_with_ttl("a".into(), "1".into(), Duration::from_secs(1));
        cache.set_with_ttl("b".into(), "2".into(), Duration::from_secs(60));
        let _ = cache.get("a");
        let _ = cache.get("zzz");
        clock.advance(Duration::from_secs(2));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 2);

        cache.prune();
        assert_eq!(cache.stats().evictions, 1);

        cache.reset_stats();
        assert_eq!(cache.stats().inserts, 0);
    }

    #[test]
    fn test_with_config_capacity_hint() {
        let config = CacheConfig::default().with_initial_capacity(256);
        let cache: TtlCache<u32, u32> = TtlCache::with_config(config.clone());
        assert_eq!(cache.config(), &config);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_debug_output() {
        let cache: TtlCache<u32, u32> = TtlCache::new();
        cache.set(1, 1);
        let out = format!("{cache:?}");
        assert!(out.contains("TtlCache"));
        assert!(out.contains("entries: 1"));
    }

    proptest! {
        #[test]
        fn prop_fresh_set_is_visible(
            keys in proptest::collection::hash_set("[a-z]{1,8}", 1..32),
            ttl_ms in 1u64..10_000,
        ) {
            let (cache, _clock) = manual_cache();
            for k in &keys {
                cache.set_with_ttl(k.clone(), k.to_uppercase(), Duration::from_millis(ttl_ms));
            }
            for k in &keys {
                prop_assert_eq!(cache.get(k.as_str()), Some(k.to_uppercase()));
            }
        }

        #[test]
        fn prop_prune_never_removes_fresh(
            ttls in proptest::collection::hash_map("[a-z]{1,6}", 0u64..200, 0..48),
            elapsed_ms in 0u64..250,
        ) {
            let (cache, clock) = manual_cache();
            for (k, ttl) in &ttls {
                cache.set_with_ttl(k.clone(), k.clone(), Duration::from_millis(*ttl));
            }
            clock.advance(Duration::from_millis(elapsed_ms));

            let fresh: HashSet<&String> = ttls
                .iter()
                .filter(|(_, ttl)| **ttl > 0 && elapsed_ms <= **ttl)
                .map(|(k, _)| k)
                .collect();

            let removed = cache.prune();
            prop_assert_eq!(removed, ttls.len() - fresh.len());
            prop_assert_eq!(cache.len(), fresh.len());
            for k in fresh {
                prop_assert!(cache.contains_key(k.as_str()));
            }
            prop_assert_eq!(cache.prune(), 0);
        }
    }
}
