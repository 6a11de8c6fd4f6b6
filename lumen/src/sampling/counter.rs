//! Samples every Nth event.

use super::{SamplingMetrics, SamplingPolicy};
use crate::event::Event;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct CounterPolicy {
    every_n: u64,
    counter: AtomicU64,
    metrics: SamplingMetrics,
}

impl CounterPolicy {
    pub fn new(every_n: u64) -> Self {
        Self {
            every_n: every_n.max(1),
            counter: AtomicU64::new(0),
            metrics: SamplingMetrics::new("counter"),
        }
    }
}

impl SamplingPolicy for CounterPolicy {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn should_sample(&self, _event: &Event) -> bool {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        n % self.every_n == 0
    }

    fn metrics(&self) -> &SamplingMetrics {
        &self.metrics
    }
}
