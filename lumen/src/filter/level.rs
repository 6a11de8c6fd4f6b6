//! Runtime-adjustable minimum-level filter with per-source-context overrides.

use super::Filter;
use crate::event::{Event, Level};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

/// Filters events below a minimum level. The default level is adjustable at runtime
/// (an atomic, following the teacher's `Trace::set_level`/`get_level` pattern);
/// per-source-context overrides take the longest matching prefix over the event's
/// `SourceContext` property, falling back to the default when nothing matches.
pub struct LevelFilter {
    default_level: AtomicU8,
    /// Sorted longest-prefix-first so the first match found is already the longest.
    overrides: RwLock<Vec<(String, Level)>>,
}

impl LevelFilter {
    pub fn new(default_level: Level) -> Self {
        Self {
            default_level: AtomicU8::new(default_level as u8),
            overrides: RwLock::new(Vec::new()),
        }
    }

    pub fn set_default_level(&self, level: Level) {
        self.default_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn default_level(&self) -> Level {
        Level::from_u8(self.default_level.load(Ordering::Relaxed)).unwrap_or(Level::Information)
    }

    /// Registers (or replaces) a minimum-level override for source contexts matching
    /// `prefix`. Overrides are re-sorted by descending prefix length so the longest
    /// match always wins, matching the semantics of hierarchical logger namespaces
    /// (e.g. `MyApp.Data` should win over a broader `MyApp` override).
    pub fn set_override(&self, prefix: impl Into<String>, level: Level) {
        let prefix = prefix.into();
        let mut overrides = self.overrides.write();
        if let Some(slot) = overrides.iter_mut().find(|(p, _)| *p == prefix) {
            slot.1 = level;
        } else {
            overrides.push((prefix, level));
        }
        overrides.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    fn effective_level(&self, source_context: Option<&str>) -> Level {
        if let Some(source) = source_context {
            let overrides = self.overrides.read();
            for (prefix, level) in overrides.iter() {
                if source.starts_with(prefix.as_str()) {
                    return *level;
                }
            }
        }
        self.default_level()
    }
}

impl Filter for LevelFilter {
    fn allow(&self, event: &Event) -> bool {
        let source_context = event.property("SourceContext").and_then(|v| v.as_str());
        event.level >= self.effective_level(source_context)
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use crate::capture::CapturedValue;
    use crate::event::PropertyBag;
    use chrono::Utc;

    fn event_with_source(source: &str, level: Level) -> Event {
        let mut props = PropertyBag::new();
        props.set("SourceContext", CapturedValue::Str(source.into()));
        Event::new(Utc::now(), level, "msg", props)
    }

    #[test]
    fn longest_prefix_override_wins() {
        let filter = LevelFilter::new(Level::Information);
        filter.set_override("MyApp", Level::Warning);
        filter.set_override("MyApp.Data", Level::Debug);

        assert!(filter.allow(&event_with_source("MyApp.Data.Repo", Level::Debug)));
        assert!(!filter.allow(&event_with_source("MyApp.Web", Level::Information)));
        assert!(filter.allow(&event_with_source("MyApp.Web", Level::Warning)));
    }

    #[test]
    fn default_level_is_runtime_adjustable() {
        let filter = LevelFilter::new(Level::Warning);
        let event = event_with_source("Unmatched", Level::Information);
        assert!(!filter.allow(&event));
        filter.set_default_level(Level::Verbose);
        assert!(filter.allow(&event));
    }
}
