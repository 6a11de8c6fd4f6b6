//! Admits every nth call for a named group, where the counter is shared across every
//! `GroupPolicy` naming the same group (not private per-instance state).
//!
//! Typical use: several filters spread across a pipeline all name the group
//! `"db-timeout"` so that, however many places raise it, only every nth occurrence
//! across all of them is admitted.

use super::registry::SamplingRegistry;
use super::{SamplingMetrics, SamplingPolicy};
use crate::event::Event;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub struct GroupPolicy {
    group: String,
    every_n: u64,
    registry: Arc<SamplingRegistry>,
    metrics: SamplingMetrics,
}

impl GroupPolicy {
    pub fn new(group: impl Into<String>, every_n: u64, registry: Arc<SamplingRegistry>) -> Self {
        Self {
            group: group.into(),
            every_n: every_n.max(1),
            registry,
            metrics: SamplingMetrics::new("group"),
        }
    }
}

impl SamplingPolicy for GroupPolicy {
    fn name(&self) -> &'static str {
        "group"
    }

    fn should_sample(&self, _event: &Event) -> bool {
        let counter = self.registry.group_counter(&self.group, &self.metrics);
        let n = counter.fetch_add(1, Ordering::Relaxed);
        n % self.every_n == 0
    }

    fn metrics(&self) -> &SamplingMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use crate::capture::CapturedValue;
    use crate::event::{Level, PropertyBag};
    use chrono::Utc;

    fn any_event() -> Event {
        let mut props = PropertyBag::new();
        props.set("ErrorCode", CapturedValue::Str("E1".into()));
        Event::new(Utc::now(), Level::Error, "m", props)
    }

    #[test]
    fn admits_every_nth_call() {
        let registry = Arc::new(SamplingRegistry::default());
        let policy = GroupPolicy::new("db-timeout", 3, registry);
        let admitted: Vec<bool> = (0..6).map(|_| policy.should_sample(&any_event())).collect();
        assert_eq!(admitted, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn two_instances_naming_the_same_group_share_one_counter() {
        let registry = Arc::new(SamplingRegistry::default());
        let a = GroupPolicy::new("db-timeout", 2, Arc::clone(&registry));
        let b = GroupPolicy::new("db-timeout", 2, registry);

        assert!(a.should_sample(&any_event())); // call 1 (global)
        assert!(!b.should_sample(&any_event())); // call 2 (global)
        assert!(a.should_sample(&any_event())); // call 3 (global)
    }

    #[test]
    fn distinct_groups_do_not_interfere() {
        let registry = Arc::new(SamplingRegistry::default());
        let a = GroupPolicy::new("db-timeout", 2, Arc::clone(&registry));
        let b = GroupPolicy::new("cache-miss", 2, registry);

        assert!(a.should_sample(&any_event()));
        assert!(b.should_sample(&any_event()));
    }
}
