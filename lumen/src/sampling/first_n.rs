//! Samples only the first N events ever seen, then stops admitting.

use super::{SamplingMetrics, SamplingPolicy};
use crate::event::Event;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct FirstNPolicy {
    limit: u64,
    seen: AtomicU64,
    metrics: SamplingMetrics,
}

impl FirstNPolicy {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            seen: AtomicU64::new(0),
            metrics: SamplingMetrics::new("first_n"),
        }
    }
}

impl SamplingPolicy for FirstNPolicy {
    fn name(&self) -> &'static str {
        "first_n"
    }

    fn should_sample(&self, _event: &Event) -> bool {
        let n = self.seen.fetch_add(1, Ordering::Relaxed);
        n < self.limit
    }

    fn metrics(&self) -> &SamplingMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use crate::event::{Level, PropertyBag};
    use chrono::Utc;

    #[test]
    fn stops_after_limit() {
        let policy = FirstNPolicy::new(2);
        let event = Event::new(Utc::now(), Level::Information, "m", PropertyBag::new());
        let decisions: Vec<bool> = (0..4).map(|_| policy.should_sample(&event)).collect();
        assert_eq!(decisions, vec![true, true, false, false]);
    }
}
