//! Sampling engine: statistical/time/count-based decisions layered on top of filters.
//!
//! Where a [`crate::filter::Filter`] makes a binary admit/deny decision, a sampling
//! policy additionally tracks how many events it has admitted vs. skipped, exposed via
//! [`SamplingMetrics`] for the Prometheus exposition in [`crate::observability`].

mod adaptive;
mod backoff;
mod caches;
mod conditional;
mod counter;
mod duration;
mod first_n;
mod group;
mod metrics;
mod rate;
mod registry;

pub use adaptive::AdaptivePolicy;
pub use backoff::BackoffPolicy;
pub use conditional::ConditionalPolicy;
pub use counter::CounterPolicy;
pub use duration::DurationPolicy;
pub use first_n::FirstNPolicy;
pub use group::GroupPolicy;
pub use metrics::SamplingMetrics;
pub use rate::RatePolicy;
pub use registry::{BackoffState, GroupCounter, SamplingRegistry};

use crate::event::Event;
use std::sync::Arc;

/// A sampling decision, with the policy's name attached for metrics attribution.
pub trait SamplingPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn should_sample(&self, event: &Event) -> bool;
    fn metrics(&self) -> &SamplingMetrics;
}

/// Wraps a sampling policy as a [`crate::filter::Filter`], recording the decision in
/// the policy's metrics before returning it — this is the seam the pipeline calls
/// through, keeping the filter stage and the sampling stage structurally identical
/// from the dispatcher's point of view.
pub struct SamplingFilter {
    policy: Arc<dyn SamplingPolicy>,
}

impl SamplingFilter {
    pub fn new(policy: Arc<dyn SamplingPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Arc<dyn SamplingPolicy> {
        &self.policy
    }
}

impl crate::filter::Filter for SamplingFilter {
    fn allow(&self, event: &Event) -> bool {
        let sampled = self.policy.should_sample(event);
        if sampled {
            self.policy.metrics().record_sampled();
        } else {
            self.policy.metrics().record_skipped();
        }
        sampled
    }
}
