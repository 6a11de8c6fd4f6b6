//! Samples a fixed fraction of events, chosen independently per event via RNG.

use super::{SamplingMetrics, SamplingPolicy};
use crate::event::Event;
use rand::Rng;

pub struct RatePolicy {
    rate: f64,
    metrics: SamplingMetrics,
}

impl RatePolicy {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            metrics: SamplingMetrics::new("rate"),
        }
    }
}

impl SamplingPolicy for RatePolicy {
    fn name(&self) -> &'static str {
        "rate"
    }

    fn should_sample(&self, _event: &Event) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        if self.rate <= 0.0 {
            return false;
        }
        rand::rng().random::<f64>() < self.rate
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
    fn absolute_rates_are_deterministic() {
        let event = Event::new(Utc::now(), Level::Information, "m", PropertyBag::new());
        let always = RatePolicy::new(1.0);
        let never = RatePolicy::new(0.0);
        for _ in 0..10 {
            assert!(always.should_sample(&event));
            assert!(!never.should_sample(&event));
        }
    }
}
