//! Flags events logged close to or past a caller-supplied deadline, and optionally
//! upgrades the event's severity when it is.
//!
//! Tracking "has this key already warned" needs its own bounded set, separate from the
//! general per-key cache, so that a key which keeps recurring past its deadline doesn't
//! re-warn (and re-upgrade) on every single event — only the first approach warning is
//! flagged via `deadline.first_warning`.

use crate::capture::CapturedValue;
use crate::event::{Level, PropertyBag};
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::Duration;

const SHARD_COUNT: usize = 16;

/// How close to (or past) a deadline an event must be before the enricher flags it.
#[derive(Debug, Clone)]
pub struct DeadlineConfig {
    /// Absolute time-remaining threshold: flag once remaining time drops below this.
    pub threshold: Duration,
    /// Optional fraction (0.0–1.0) of the total deadline window remaining; flagged if
    /// either this or `threshold` trips first.
    pub percentage_threshold: Option<f64>,
    /// Raise the event to at least [`Level::Warning`] once flagged.
    pub upgrade_level: bool,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            threshold: Duration::from_millis(100),
            percentage_threshold: None,
            upgrade_level: true,
        }
    }
}

pub struct DeadlineEnricher {
    first_warning: Vec<Mutex<LruCache<String, ()>>>,
    config: DeadlineConfig,
}

impl DeadlineEnricher {
    pub fn new(cache_capacity_per_shard: usize, config: DeadlineConfig) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity_per_shard.max(1)).unwrap();
        Self {
            first_warning: (0..SHARD_COUNT).map(|_| Mutex::new(LruCache::new(capacity))).collect(),
            config,
        }
    }

    fn shard_index(key: &str) -> usize {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % SHARD_COUNT
    }

    /// Returns `true` only the first time `key` is seen approaching its deadline.
    fn first_time_approaching(&self, key: &str) -> bool {
        let shard = Self::shard_index(key);
        let mut warned = self.first_warning[shard].lock();
        if warned.contains(key) {
            false
        } else {
            warned.put(key.to_string(), ());
            true
        }
    }

    /// `key` identifies the logical operation (e.g. request id) so repeated calls for
    /// the same deadline share first-warning bookkeeping; `start`/`deadline` bound the
    /// operation's budget. Returns the (possibly upgraded) level to actually dispatch
    /// the event at.
    pub fn enrich_with_deadline(
        &self,
        properties: &mut PropertyBag,
        key: &str,
        start: DateTime<Utc>,
        deadline: DateTime<Utc>,
        level: Level,
    ) -> Level {
        let now = Utc::now();
        let remaining_ms = (deadline - now).num_milliseconds();
        properties.set("deadline.at", CapturedValue::Str(deadline.to_rfc3339()));

        if remaining_ms <= 0 {
            properties.set("deadline.exceeded", CapturedValue::Bool(true));
            properties.set("deadline.exceeded_by_ms", CapturedValue::Int(-remaining_ms));
            return self.maybe_upgrade(level);
        }

        let within_absolute = remaining_ms as u64 <= self.config.threshold.as_millis() as u64;
        let within_percentage = self.config.percentage_threshold.is_some_and(|pct| {
            let total_ms = (deadline - start).num_milliseconds().max(1);
            (remaining_ms as f64 / total_ms as f64) <= pct
        });

        if within_absolute || within_percentage {
            properties.set("deadline.remaining_ms", CapturedValue::Int(remaining_ms));
            properties.set("deadline.approaching", CapturedValue::Bool(true));
            if self.first_time_approaching(key) {
                properties.set("deadline.first_warning", CapturedValue::Bool(true));
            }
            return self.maybe_upgrade(level);
        }

        level
    }

    fn maybe_upgrade(&self, level: Level) -> Level {
        if self.config.upgrade_level && level < Level::Warning {
            Level::Warning
        } else {
            level
        }
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn approaching_deadline_warns_once_per_key() {
        let enricher = DeadlineEnricher::new(16, DeadlineConfig::default());
        let start = Utc::now() - ChronoDuration::milliseconds(50);
        let deadline = Utc::now() + ChronoDuration::milliseconds(50);

        let mut first = PropertyBag::new();
        let level = enricher.enrich_with_deadline(&mut first, "req-1", start, deadline, Level::Information);
        assert_eq!(level, Level::Warning);
        assert_eq!(first.get("deadline.approaching"), Some(&CapturedValue::Bool(true)));
        assert_eq!(first.get("deadline.first_warning"), Some(&CapturedValue::Bool(true)));

        let mut second = PropertyBag::new();
        enricher.enrich_with_deadline(&mut second, "req-1", start, deadline, Level::Information);
        assert_eq!(second.get("deadline.first_warning"), None);
    }

    #[test]
    fn exceeded_deadline_upgrades_and_reports_overrun() {
        let enricher = DeadlineEnricher::new(16, DeadlineConfig::default());
        let start = Utc::now() - ChronoDuration::milliseconds(200);
        let deadline = Utc::now() - ChronoDuration::milliseconds(5);

        let mut props = PropertyBag::new();
        let level = enricher.enrich_with_deadline(&mut props, "req-2", start, deadline, Level::Information);
        assert_eq!(level, Level::Warning);
        assert_eq!(props.get("deadline.exceeded"), Some(&CapturedValue::Bool(true)));
        match props.get("deadline.exceeded_by_ms") {
            Some(CapturedValue::Int(ms)) => assert!(*ms > 0),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn comfortably_within_budget_is_untouched() {
        let enricher = DeadlineEnricher::new(16, DeadlineConfig::default());
        let start = Utc::now();
        let deadline = Utc::now() + ChronoDuration::seconds(5);

        let mut props = PropertyBag::new();
        let level = enricher.enrich_with_deadline(&mut props, "req-3", start, deadline, Level::Information);
        assert_eq!(level, Level::Information);
        assert!(props.get("deadline.approaching").is_none());
        assert!(props.get("deadline.exceeded").is_none());
    }
}
