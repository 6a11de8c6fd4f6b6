//! Samples at most once per fixed duration window.

use super::{SamplingMetrics, SamplingPolicy};
use crate::event::Event;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

pub struct DurationPolicy {
    window: Duration,
    last_sampled: Mutex<Option<Instant>>,
    metrics: SamplingMetrics,
}

impl DurationPolicy {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sampled: Mutex::new(None),
            metrics: SamplingMetrics::new("duration"),
        }
    }
}

impl SamplingPolicy for DurationPolicy {
    fn name(&self) -> &'static str {
        "duration"
    }

    fn should_sample(&self, _event: &Event) -> bool {
        let mut last = self.last_sampled.lock();
        let now = Instant::now();
        match *last {
            Some(previous) if now.duration_since(previous) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    fn metrics(&self) -> &SamplingMetrics {
        &self.metrics
    }
}
