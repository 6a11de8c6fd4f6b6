//! Derives a `SourceContext` property from the call site, with a bounded LRU cache
//! keyed by the call site's `file:line` pair.
//!
//! Rust has no portable equivalent of the original's raw program-counter-keyed cache
//! (there's no runtime stack-frame reflection outside of the `backtrace`/`std::backtrace`
//! APIs, which resolve far more than a single stable identity per call site); the
//! `#[track_caller]`-provided `Location` plays the same role here — it's the cheapest
//! stable-per-call-site identity Rust exposes, and like the original's PC it's safe to
//! use directly as a cache key without hashing it first.

use super::Enricher;
use crate::capture::CapturedValue;
use crate::event::PropertyBag;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::panic::Location;
use std::sync::Arc;

pub struct SourceContextEnricher {
    cache: Mutex<LruCache<(&'static str, u32), Arc<str>>>,
    location: &'static Location<'static>,
}

impl SourceContextEnricher {
    #[track_caller]
    pub fn new(cache_capacity: usize) -> Self {
        Self::with_location(cache_capacity, Location::caller())
    }

    fn with_location(cache_capacity: usize, location: &'static Location<'static>) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity.max(1)).unwrap();
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            location,
        }
    }

    fn resolve(&self) -> Arc<str> {
        let key = (self.location.file(), self.location.line());
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.get(&key) {
            return Arc::clone(cached);
        }
        let context = module_path_from_file(key.0);
        let resolved: Arc<str> = Arc::from(context);
        cache.put(key, Arc::clone(&resolved));
        resolved
    }
}

impl Enricher for SourceContextEnricher {
    fn enrich(&self, properties: &mut PropertyBag) {
        properties.set("SourceContext", CapturedValue::Str(self.resolve().to_string()));
    }
}

fn module_path_from_file(file: &str) -> String {
    file.trim_end_matches(".rs")
        .replace(['/', '\\'], ".")
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
mod __test__ {
    use super::*;

    #[test]
    fn enriches_with_source_context() {
        let enricher = SourceContextEnricher::new(16);
        let mut props = PropertyBag::new();
        enricher.enrich(&mut props);
        assert!(props.get("SourceContext").and_then(|v| v.as_str()).is_some());
    }

    #[test]
    fn repeated_enrichment_hits_cache() {
        let enricher = SourceContextEnricher::new(16);
        let mut a = PropertyBag::new();
        let mut b = PropertyBag::new();
        enricher.enrich(&mut a);
        enricher.enrich(&mut b);
        assert_eq!(a.get("SourceContext"), b.get("SourceContext"));
    }
}
