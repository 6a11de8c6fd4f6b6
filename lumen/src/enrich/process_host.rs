//! Process and host identity enrichers.
//!
//! Grounded directly on the teacher's snapshot writer, which stamps every persisted
//! snapshot with `gethostname::gethostname()` and `std::process::id()`; here the same
//! two calls populate per-event properties instead of a once-per-snapshot header,
//! feeding both ad-hoc property access and the OTLP sink's resource attributes.

use super::Enricher;
use crate::capture::CapturedValue;
use crate::event::PropertyBag;
use once_cell::sync::Lazy;

static HOSTNAME: Lazy<String> = Lazy::new(|| {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| "unknown-host".to_string())
});

pub struct HostEnricher;

impl Enricher for HostEnricher {
    fn enrich(&self, properties: &mut PropertyBag) {
        properties.set("host.name", CapturedValue::Str(HOSTNAME.clone()));
    }
}

pub struct ProcessEnricher;

impl ProcessEnricher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl Enricher for ProcessEnricher {
    fn enrich(&self, properties: &mut PropertyBag) {
        // A single `ProcessEnricher` instance is shared (via `Arc<dyn Enricher>`)
        // across every thread that logs through the pipeline, so the thread id must
        // be read fresh here rather than cached at construction — caching it would
        // stamp every event, regardless of which thread emitted it, with whichever
        // thread happened to build the pipeline.
        properties.set("process.pid", CapturedValue::UInt(std::process::id() as u64));
        properties.set("thread.id", CapturedValue::UInt(current_thread_id_u64()));
    }
}

/// Same hashing-based thread-id derivation technique as the teacher's
/// `event_builder::current_thread_id_u64` / `utils::current_thread_id_u32`: Rust gives
/// no portable numeric thread id, so `ThreadId`'s `Hash` impl is folded into a u64.
fn current_thread_id_u64() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod __test__ {
    use super::*;

    #[test]
    fn host_and_process_enrichers_set_properties() {
        let mut props = PropertyBag::new();
        HostEnricher.enrich(&mut props);
        ProcessEnricher::new().enrich(&mut props);
        assert!(props.contains("host.name"));
        assert!(props.contains("process.pid"));
        assert!(props.contains("thread.id"));
    }

    #[test]
    fn thread_id_reflects_the_emitting_thread_not_the_constructing_one() {
        use std::sync::Arc;
        let enricher: Arc<dyn Enricher> = Arc::new(ProcessEnricher::new());

        let mut here = PropertyBag::new();
        enricher.enrich(&mut here);
        let here_id = here.get("thread.id").cloned();

        let other = std::thread::spawn({
            let enricher = Arc::clone(&enricher);
            move || {
                let mut props = PropertyBag::new();
                enricher.enrich(&mut props);
                props.get("thread.id").cloned()
            }
        })
        .join()
        .unwrap();

        assert_ne!(here_id, other);
    }
}
