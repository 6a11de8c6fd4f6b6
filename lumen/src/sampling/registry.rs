//! Process-wide state shared by `Group` and `Backoff` sampling policies.
//!
//! Both policies are defined against state keyed by a *name*, not by the identity of
//! the policy instance: two `GroupPolicy`s naming the same group must advance the same
//! counter, and two `BackoffPolicy`s naming the same key must advance the same
//! call-count/threshold pair. A registry owns that state explicitly — callers build one
//! and pass it (usually as an `Arc`) to every policy that should share it — rather than
//! reaching for a hidden global static, so a test can build an isolated registry and
//! never observe another test's counters.

use super::caches::ShardedLruCache;
use super::SamplingMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Call counter shared by every `GroupPolicy` naming the same group.
pub type GroupCounter = Arc<AtomicU64>;

/// Call-count/threshold bookkeeping shared by every `BackoffPolicy` naming the same key.
#[derive(Debug)]
pub struct BackoffState {
    pub(super) count: AtomicU64,
    pub(super) next_threshold: AtomicU64,
    pub(super) power_index: AtomicU64,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            next_threshold: AtomicU64::new(1),
            power_index: AtomicU64::new(0),
        }
    }
}

pub struct SamplingRegistry {
    groups: ShardedLruCache<String, GroupCounter>,
    backoffs: ShardedLruCache<String, Arc<BackoffState>>,
}

impl SamplingRegistry {
    /// `cache_capacity_per_shard` bounds each of the 16 internal shards; entries for
    /// groups/keys that fall out of the LRU lose their counter and start over, which is
    /// acceptable because sampling is advisory.
    pub fn new(cache_capacity_per_shard: usize) -> Self {
        Self {
            groups: ShardedLruCache::new(cache_capacity_per_shard),
            backoffs: ShardedLruCache::new(cache_capacity_per_shard),
        }
    }

    pub fn group_counter(&self, name: &str, metrics: &SamplingMetrics) -> GroupCounter {
        self.groups
            .get_or_insert_with(name.to_string(), || Arc::new(AtomicU64::new(0)), metrics)
    }

    pub fn backoff_state(&self, key: &str, metrics: &SamplingMetrics) -> Arc<BackoffState> {
        self.backoffs
            .get_or_insert_with(key.to_string(), || Arc::new(BackoffState::default()), metrics)
    }
}

impl Default for SamplingRegistry {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;

    #[test]
    fn same_group_name_shares_the_same_counter() {
        let registry = SamplingRegistry::default();
        let metrics = SamplingMetrics::new("group");
        let a = registry.group_counter("checkout", &metrics);
        let b = registry.group_counter("checkout", &metrics);
        a.fetch_add(1, Ordering::Relaxed);
        assert_eq!(b.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn distinct_group_names_get_independent_counters() {
        let registry = SamplingRegistry::default();
        let metrics = SamplingMetrics::new("group");
        let a = registry.group_counter("checkout", &metrics);
        let b = registry.group_counter("refund", &metrics);
        a.fetch_add(5, Ordering::Relaxed);
        assert_eq!(b.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn independent_registries_never_share_state() {
        let metrics = SamplingMetrics::new("group");
        let r1 = SamplingRegistry::default();
        let r2 = SamplingRegistry::default();
        r1.group_counter("checkout", &metrics).fetch_add(3, Ordering::Relaxed);
        assert_eq!(r2.group_counter("checkout", &metrics).load(Ordering::Relaxed), 0);
    }
}
