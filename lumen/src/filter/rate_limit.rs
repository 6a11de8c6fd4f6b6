//! Token-bucket rate limiting filter.

use super::Filter;
use crate::event::Event;
use parking_lot::Mutex;
use std::time::Instant;

/// Allows at most `rate` events per `per` duration, using a simple token bucket.
/// Distinct from the sampling engine's `Rate` policy (§4.F): this is a hard admission
/// gate meant to protect downstream systems, not a statistical sampling decision, so
/// it carries no `SamplingMetrics` and is not swappable for a different policy.
pub struct RateLimitFilter {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimitFilter {
    pub fn new(rate: u32, per: std::time::Duration) -> Self {
        let refill_per_sec = rate as f64 / per.as_secs_f64().max(f64::EPSILON);
        Self {
            state: Mutex::new(BucketState {
                tokens: rate as f64,
                last_refill: Instant::now(),
            }),
            capacity: rate as f64,
            refill_per_sec,
        }
    }
}

impl Filter for RateLimitFilter {
    fn allow(&self, _event: &Event) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use crate::event::{Level, PropertyBag};
    use chrono::Utc;

    fn event() -> Event {
        Event::new(Utc::now(), Level::Information, "msg", PropertyBag::new())
    }

    #[test]
    fn bucket_admits_up_to_capacity_then_denies() {
        let filter = RateLimitFilter::new(3, std::time::Duration::from_secs(60));
        assert!(filter.allow(&event()));
        assert!(filter.allow(&event()));
        assert!(filter.allow(&event()));
        assert!(!filter.allow(&event()));
    }
}
