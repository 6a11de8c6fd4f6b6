//! Admits a named key on call counts 1, ⌈factor⌉, ⌈factor²⌉, ⌈factor³⌉, … — a purely
//! call-count-driven geometric backoff, with no wall-clock component. State is shared
//! across every `BackoffPolicy` naming the same key, the same way `Group` shares its
//! counter.

use super::registry::{BackoffState, SamplingRegistry};
use super::{SamplingMetrics, SamplingPolicy};
use crate::event::Event;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub struct BackoffPolicy {
    key: String,
    factor: f64,
    registry: Arc<SamplingRegistry>,
    metrics: SamplingMetrics,
}

impl BackoffPolicy {
    pub fn new(key: impl Into<String>, factor: f64, registry: Arc<SamplingRegistry>) -> Self {
        Self {
            key: key.into(),
            factor: factor.max(1.0),
            registry,
            metrics: SamplingMetrics::new("backoff"),
        }
    }

    /// Advances `state` past the threshold it just admitted, to `⌈factor^power⌉` for
    /// the next power in the sequence. Floored at `threshold + 1` so a `factor` close
    /// enough to 1 that `ceil` doesn't move the value still makes forward progress
    /// instead of re-admitting every call.
    fn advance(&self, state: &BackoffState, threshold: u64) {
        let power = state.power_index.fetch_add(1, Ordering::Relaxed) + 1;
        let candidate = self.factor.powi(power as i32).ceil() as u64;
        state.next_threshold.store(candidate.max(threshold + 1), Ordering::Relaxed);
    }
}

impl SamplingPolicy for BackoffPolicy {
    fn name(&self) -> &'static str {
        "backoff"
    }

    fn should_sample(&self, _event: &Event) -> bool {
        let state = self.registry.backoff_state(&self.key, &self.metrics);
        let count = state.count.fetch_add(1, Ordering::Relaxed) + 1;
        let threshold = state.next_threshold.load(Ordering::Relaxed);
        if count < threshold {
            return false;
        }
        self.advance(&state, threshold);
        true
    }

    fn metrics(&self) -> &SamplingMetrics {
        &self.metrics
    }
}
