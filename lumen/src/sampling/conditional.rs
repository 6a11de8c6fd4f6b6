//! Applies an inner sampling policy only to events matching a predicate; events that
//! don't match bypass sampling entirely (always admitted).

use super::{SamplingMetrics, SamplingPolicy};
use crate::event::Event;
use std::sync::Arc;

pub struct ConditionalPolicy {
    predicate: Box<dyn Fn(&Event) -> bool + Send + Sync>,
    inner: Arc<dyn SamplingPolicy>,
    metrics: SamplingMetrics,
}

impl ConditionalPolicy {
    pub fn new(
        predicate: impl Fn(&Event) -> bool + Send + Sync + 'static,
        inner: Arc<dyn SamplingPolicy>,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner,
            metrics: SamplingMetrics::new("conditional"),
        }
    }
}

impl SamplingPolicy for ConditionalPolicy {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn should_sample(&self, event: &Event) -> bool {
        if !(self.predicate)(event) {
            return true;
        }
        self.inner.should_sample(event)
    }

    fn metrics(&self) -> &SamplingMetrics {
        &self.metrics
    }
}
