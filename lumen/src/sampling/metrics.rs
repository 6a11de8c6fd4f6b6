//! Per-policy sampling counters, exposed as text, verbose text, a debug dump, and a
//! Prometheus-style counter list. Follows the same atomics-plus-accessor shape as
//! [`crate::event::PipelineMetrics`].

use std::sync::atomic::{AtomicU64, Ordering};
use tabled::Tabled;

#[derive(Debug, Default)]
pub struct SamplingMetrics {
    policy_name: &'static str,
    sampled: AtomicU64,
    skipped: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Tabled)]
struct MetricsRow {
    policy: &'static str,
    sampled: u64,
    skipped: u64,
    cache_hits: u64,
    cache_misses: u64,
    evictions: u64,
}

impl SamplingMetrics {
    pub fn new(policy_name: &'static str) -> Self {
        Self {
            policy_name,
            ..Default::default()
        }
    }

    pub fn record_sampled(&self) {
        self.sampled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sampled(&self) -> u64 {
        self.sampled.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    fn row(&self) -> MetricsRow {
        MetricsRow {
            policy: self.policy_name,
            sampled: self.sampled(),
            skipped: self.skipped(),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Compact single-line summary: `policy=X sampled=N skipped=N`.
    pub fn to_text(&self) -> String {
        format!(
            "policy={} sampled={} skipped={}",
            self.policy_name,
            self.sampled(),
            self.skipped()
        )
    }

    /// A small table, one row, all counters — for human-facing diagnostics.
    pub fn to_verbose_text(&self) -> String {
        tabled::Table::new([self.row()]).to_string()
    }

    /// Rust-syntax debug dump, for logs/tests that want the raw shape.
    pub fn to_debug(&self) -> String {
        format!("{:?}", self.row_debug())
    }

    fn row_debug(&self) -> (&'static str, u64, u64, u64, u64, u64) {
        let r = self.row();
        (r.policy, r.sampled, r.skipped, r.cache_hits, r.cache_misses, r.evictions)
    }

    /// Prometheus counter family, with the `mtlog_sampling_*` name prefix that this
    /// crate's OTLP-adjacent consumers expect from the wire format it interoperates
    /// with.
    pub fn to_prometheus(&self) -> Vec<(String, u64)> {
        vec![
            (format!("mtlog_sampling_sampled_total{{policy=\"{}\"}}", self.policy_name), self.sampled()),
            (format!("mtlog_sampling_skipped_total{{policy=\"{}\"}}", self.policy_name), self.skipped()),
            (
                format!("mtlog_sampling_cache_hits_total{{policy=\"{}\"}}", self.policy_name),
                self.cache_hits.load(Ordering::Relaxed),
            ),
            (
                format!("mtlog_sampling_cache_misses_total{{policy=\"{}\"}}", self.policy_name),
                self.cache_misses.load(Ordering::Relaxed),
            ),
            (
                format!("mtlog_sampling_evictions_total{{policy=\"{}\"}}", self.policy_name),
                self.evictions.load(Ordering::Relaxed),
            ),
        ]
    }
}
