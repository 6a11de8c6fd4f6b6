//! OTEL trace-context enrichers, in three flavors trading lookup cost for staleness.
//!
//! - [`FastTraceEnricher`] re-reads the current OTEL context on every call — correct
//!   under span changes, costs a context lookup per event.
//! - [`StaticTraceEnricher`] captures one fixed `(trace_id, span_id)` pair at
//!   construction time and stamps it on every event — cheapest, only correct for a
//!   logger that never leaves its originating span.
//! - [`CachingTraceEnricher`] re-reads the context but caches the hex-encoded string
//!   form per raw id, avoiding repeated hex formatting for a long-lived span that logs
//!   many events.

use super::Enricher;
use crate::capture::CapturedValue;
use crate::event::PropertyBag;
use lru::LruCache;
use opentelemetry::trace::{TraceContextExt, TraceId};
use parking_lot::Mutex;
use std::num::NonZeroUsize;

fn current_span_ids() -> Option<(TraceId, opentelemetry::trace::SpanId)> {
    let context = opentelemetry::Context::current();
    let span = context.span();
    let span_context = span.span_context();
    if !span_context.is_valid() {
        return None;
    }
    Some((span_context.trace_id(), span_context.span_id()))
}

/// Re-reads the ambient OTEL context on every `enrich` call.
pub struct FastTraceEnricher;

impl Enricher for FastTraceEnricher {
    fn enrich(&self, properties: &mut PropertyBag) {
        if let Some((trace_id, span_id)) = current_span_ids() {
            properties.set("trace_id", CapturedValue::Str(trace_id.to_string()));
            properties.set("span_id", CapturedValue::Str(span_id.to_string()));
        }
    }
}

/// Captures a fixed trace/span id pair at construction time.
pub struct StaticTraceEnricher {
    trace_id: String,
    span_id: String,
}

impl StaticTraceEnricher {
    pub fn capture_current() -> Option<Self> {
        let (trace_id, span_id) = current_span_ids()?;
        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
        })
    }
}

impl Enricher for StaticTraceEnricher {
    fn enrich(&self, properties: &mut PropertyBag) {
        properties.set("trace_id", CapturedValue::Str(self.trace_id.clone()));
        properties.set("span_id", CapturedValue::Str(self.span_id.clone()));
    }
}

/// Re-reads the ambient context like [`FastTraceEnricher`], but caches the hex string
/// form of each `TraceId`/`SpanId` it has already formatted.
pub struct CachingTraceEnricher {
    trace_cache: Mutex<LruCache<TraceId, String>>,
    span_cache: Mutex<LruCache<opentelemetry::trace::SpanId, String>>,
}

impl CachingTraceEnricher {
    pub fn new(cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity.max(1)).unwrap();
        Self {
            trace_cache: Mutex::new(LruCache::new(capacity)),
            span_cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Enricher for CachingTraceEnricher {
    fn enrich(&self, properties: &mut PropertyBag) {
        let Some((trace_id, span_id)) = current_span_ids() else {
            return;
        };
        let trace_str = {
            let mut cache = self.trace_cache.lock();
            cache.get(&trace_id).cloned().unwrap_or_else(|| {
                let s = trace_id.to_string();
                cache.put(trace_id, s.clone());
                s
            })
        };
        let span_str = {
            let mut cache = self.span_cache.lock();
            cache.get(&span_id).cloned().unwrap_or_else(|| {
                let s = span_id.to_string();
                cache.put(span_id, s.clone());
                s
            })
        };
        properties.set("trace_id", CapturedValue::Str(trace_str));
        properties.set("span_id", CapturedValue::Str(span_str));
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;

    #[test]
    fn fast_enricher_is_noop_without_active_span() {
        let mut props = PropertyBag::new();
        FastTraceEnricher.enrich(&mut props);
        assert!(!props.contains("trace_id"));
    }

    #[test]
    fn caching_enricher_is_noop_without_active_span() {
        let enricher = CachingTraceEnricher::new(8);
        let mut props = PropertyBag::new();
        enricher.enrich(&mut props);
        assert!(!props.contains("trace_id"));
    }
}
