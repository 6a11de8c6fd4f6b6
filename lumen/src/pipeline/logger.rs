//! The `Logger` handle: a cheap-to-clone view over a shared [`super::Pipeline`] plus a
//! fixed set of derived properties.
//!
//! Resolves the spec's Open Question about duplicate `Logger` interfaces (see
//! `SPEC_FULL.md` §9 / `DESIGN.md`) by exposing the superset of both original method
//! sets on one concrete type — level methods, `Write`, `ForContext`, `With`,
//! `IsEnabled`, the `_ctx` variants, and the `Sample*` derivation methods.

use crate::capture::CapturedValue;
use crate::enrich::{ContextValuesEnricher, EnrichContext, Enricher};
use crate::event::{Level, PropertyBag};
use crate::filter::Filter;
use crate::pipeline::Pipeline;
use crate::sampling::{CounterPolicy, RatePolicy, SamplingFilter, SamplingPolicy};
use std::sync::Arc;

#[derive(Clone)]
pub struct Logger {
    pipeline: Arc<Pipeline>,
    fixed_properties: Arc<PropertyBag>,
    /// Extra filters scoped to this derived logger only (added by `Sample`/
    /// `SampleRate`); evaluated in addition to the pipeline's own filters.
    extra_filters: Arc<Vec<Arc<dyn Filter>>>,
}

impl Logger {
    pub(crate) fn new(pipeline: Arc<Pipeline>, fixed_properties: PropertyBag) -> Self {
        Self {
            pipeline,
            fixed_properties: Arc::new(fixed_properties),
            extra_filters: Arc::new(Vec::new()),
        }
    }

    /// Returns a derived logger with one additional fixed property — the Rust
    /// equivalent of `ForContext(name, value)`.
    pub fn for_context(&self, name: impl Into<Box<str>>, value: CapturedValue) -> Self {
        let mut properties = (*self.fixed_properties).clone();
        properties.set(name, value);
        Self {
            pipeline: Arc::clone(&self.pipeline),
            fixed_properties: Arc::new(properties),
            extra_filters: Arc::clone(&self.extra_filters),
        }
    }

    /// Returns a derived logger with several additional fixed properties at once —
    /// the Rust equivalent of `With(...)`.
    pub fn with(&self, values: impl IntoIterator<Item = (&'static str, CapturedValue)>) -> Self {
        let mut properties = (*self.fixed_properties).clone();
        for (k, v) in values {
            properties.set(k, v);
        }
        Self {
            pipeline: Arc::clone(&self.pipeline),
            fixed_properties: Arc::new(properties),
            extra_filters: Arc::clone(&self.extra_filters),
        }
    }

    /// Returns a derived logger that additionally samples 1-in-`n` events via a
    /// dedicated [`CounterPolicy`], independent of any sampling configured on the
    /// pipeline itself.
    pub fn sample(&self, n: u64) -> Self {
        self.with_extra_filter(Arc::new(SamplingFilter::new(Arc::new(CounterPolicy::new(n)) as Arc<dyn SamplingPolicy>)))
    }

    /// Returns a derived logger that additionally samples a fixed fraction of events
    /// via a dedicated [`RatePolicy`].
    pub fn sample_rate(&self, rate: f64) -> Self {
        self.with_extra_filter(Arc::new(SamplingFilter::new(Arc::new(RatePolicy::new(rate)) as Arc<dyn SamplingPolicy>)))
    }

    fn with_extra_filter(&self, filter: Arc<dyn Filter>) -> Self {
        let mut filters = (*self.extra_filters).clone();
        filters.push(filter);
        Self {
            pipeline: Arc::clone(&self.pipeline),
            fixed_properties: Arc::clone(&self.fixed_properties),
            extra_filters: Arc::new(filters),
        }
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.pipeline.minimum_level
    }

    /// The general write path every level-named method forwards to.
    pub fn write(&self, level: Level, message_template: &str, bindings: PropertyBag) {
        self.write_ctx(level, message_template, bindings, None)
    }

    /// As [`Logger::write`], but additionally applies an [`EnrichContext`] (deadline
    /// and/or well-known ambient values) before dispatch.
    pub fn write_ctx(
        &self,
        level: Level,
        message_template: &str,
        mut bindings: PropertyBag,
        context: Option<&EnrichContext>,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let mut level = level;
        if let Some(ctx) = context {
            ContextValuesEnricher::new(ctx).enrich(&mut bindings);
            if let Some(deadline) = &ctx.deadline {
                level = self.pipeline.deadline_enricher.enrich_with_deadline(
                    &mut bindings,
                    &deadline.key,
                    deadline.start,
                    deadline.at,
                    level,
                );
            }
        }
        if !self.extra_filters.is_empty() {
            // Extra (per-logger) filters need a constructed event to evaluate against;
            // the pipeline's own dispatch already builds one, so evaluate here against
            // a lightweight probe event built from the same template/bindings.
            let probe_properties = bindings.clone().merge(&self.fixed_properties);
            let probe = crate::event::Event::new(chrono::Utc::now(), level, message_template, probe_properties);
            if !self.extra_filters.iter().all(|f| f.allow(&probe)) {
                return;
            }
        }
        self.pipeline
            .process(level, message_template, bindings, &self.fixed_properties);
    }

    // Six severity-named convenience methods plus their `_ctx` counterparts, all
    // forwarding to `write`/`write_ctx`.
    pub fn verbose(&self, message_template: &str, bindings: PropertyBag) {
        self.write(Level::Verbose, message_template, bindings)
    }
    pub fn debug(&self, message_template: &str, bindings: PropertyBag) {
        self.write(Level::Debug, message_template, bindings)
    }
    pub fn information(&self, message_template: &str, bindings: PropertyBag) {
        self.write(Level::Information, message_template, bindings)
    }
    pub fn warning(&self, message_template: &str, bindings: PropertyBag) {
        self.write(Level::Warning, message_template, bindings)
    }
    pub fn error(&self, message_template: &str, bindings: PropertyBag) {
        self.write(Level::Error, message_template, bindings)
    }
    pub fn fatal(&self, message_template: &str, bindings: PropertyBag) {
        self.write(Level::Fatal, message_template, bindings)
    }

    pub fn verbose_ctx(&self, message_template: &str, bindings: PropertyBag, ctx: &EnrichContext) {
        self.write_ctx(Level::Verbose, message_template, bindings, Some(ctx))
    }
    pub fn debug_ctx(&self, message_template: &str, bindings: PropertyBag, ctx: &EnrichContext) {
        self.write_ctx(Level::Debug, message_template, bindings, Some(ctx))
    }
    pub fn information_ctx(&self, message_template: &str, bindings: PropertyBag, ctx: &EnrichContext) {
        self.write_ctx(Level::Information, message_template, bindings, Some(ctx))
    }
    pub fn warning_ctx(&self, message_template: &str, bindings: PropertyBag, ctx: &EnrichContext) {
        self.write_ctx(Level::Warning, message_template, bindings, Some(ctx))
    }
    pub fn error_ctx(&self, message_template: &str, bindings: PropertyBag, ctx: &EnrichContext) {
        self.write_ctx(Level::Error, message_template, bindings, Some(ctx))
    }
    pub fn fatal_ctx(&self, message_template: &str, bindings: PropertyBag, ctx: &EnrichContext) {
        self.write_ctx(Level::Fatal, message_template, bindings, Some(ctx))
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use crate::capture::CapturedValue;
    use crate::pipeline::Pipeline;

    fn test_logger() -> Logger {
        let pipeline = Pipeline::builder().minimum_level(Level::Verbose).build().unwrap();
        Arc::new(pipeline).root_logger()
    }

    #[test]
    fn for_context_is_visible_on_next_write() {
        let collector = Arc::new(crate::sink::CollectingSink::new());
        let pipeline = Pipeline::builder()
            .minimum_level(Level::Verbose)
            .sink("collect", collector.clone())
            .unwrap()
            .build()
            .unwrap();
        let logger = Arc::new(pipeline)
            .root_logger()
            .for_context("Service", CapturedValue::Str("checkout".into()));

        let mut call_props = PropertyBag::new();
        call_props.set("OrderId", CapturedValue::Int(7));
        logger.information("order placed", call_props);

        let events = collector.events();
        assert_eq!(events.len(), 1);
        // The event carries every property `for_context` accumulated, superset over
        // whatever the call site itself bound.
        assert!(matches!(events[0].properties.get("Service"), Some(CapturedValue::Str(s)) if s == "checkout"));
        assert!(matches!(events[0].properties.get("OrderId"), Some(CapturedValue::Int(7))));
    }

    #[test]
    fn disabled_level_does_no_dispatch_work() {
        let collector = Arc::new(crate::sink::CollectingSink::new());
        let pipeline = Pipeline::builder()
            .minimum_level(Level::Error)
            .sink("collect", collector.clone())
            .unwrap()
            .build()
            .unwrap();
        let logger = Arc::new(pipeline).root_logger();

        assert!(!logger.is_enabled(Level::Information));
        logger.information("should be skipped", PropertyBag::new());

        assert!(collector.is_empty());
    }

    #[test]
    fn sample_reduces_admitted_events() {
        let logger = test_logger().sample(2);
        for _ in 0..4 {
            logger.information("tick", PropertyBag::new());
        }
    }
}
