//! Sharded bounded LRU cache shared by the group and backoff policies.
//!
//! A single global `Mutex<LruCache<_>>` would serialize every sampling decision across
//! all threads; sharding by a hash of the key spreads that contention the same way the
//! teacher's per-category string interner caches avoid a single shared lock, but with
//! real LRU eviction instead of round-robin.

use lru::LruCache;
use parking_lot::Mutex;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

const SHARD_COUNT: usize = 16;

pub struct ShardedLruCache<K, V> {
    shards: Vec<Mutex<LruCache<K, V>>>,
}

impl<K: Hash + Eq + Clone, V: Clone> ShardedLruCache<K, V> {
    pub fn new(capacity_per_shard: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity_per_shard.max(1)).unwrap();
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(LruCache::new(capacity))).collect();
        Self { shards }
    }

    fn shard_for(&self, key: &K) -> &Mutex<LruCache<K, V>> {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Returns a clone of the cached value if present, recording a hit/miss on the
    /// supplied metrics.
    pub fn get(&self, key: &K, metrics: &super::SamplingMetrics) -> Option<V> {
        let mut shard = self.shard_for(key).lock();
        let found = shard.get(key).cloned();
        if found.is_some() {
            metrics.record_cache_hit();
        } else {
            metrics.record_cache_miss();
        }
        found
    }

    /// Inserts `value` for `key`, recording an eviction if doing so displaced another
    /// entry. `LruCache::push` (unlike `put`) returns the evicted pair when the shard
    /// was full and `key` wasn't already present, which is what we need to attribute
    /// the eviction correctly instead of confusing it with a same-key value update.
    pub fn put(&self, key: K, value: V, metrics: &super::SamplingMetrics) {
        let mut shard = self.shard_for(&key).lock();
        if shard.push(key, value).is_some() {
            metrics.record_eviction();
        }
    }

    /// Returns the existing entry for `key`, or inserts and returns `make()`'s result if
    /// absent. Holds the shard lock across the check-and-insert so concurrent first
    /// callers for the same key can't each construct and insert their own value.
    pub fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V, metrics: &super::SamplingMetrics) -> V {
        let mut shard = self.shard_for(&key).lock();
        if let Some(existing) = shard.get(&key) {
            metrics.record_cache_hit();
            return existing.clone();
        }
        metrics.record_cache_miss();
        let value = make();
        if shard.push(key, value.clone()).is_some() {
            metrics.record_eviction();
        }
        value
    }
}
