//! The pipeline: admission check → allocate → enrich → filter → capture → dispatch.

mod builder;
mod logger;

pub use builder::PipelineBuilder;
pub use logger::Logger;

use crate::capture::Capturer;
use crate::enrich::{DeadlineEnricher, EnricherChain};
use crate::event::{Event, Level, PipelineMetrics, PropertyBag};
use crate::filter::Filter;
use crate::observability::SelfLog;
use crate::sink::Sink;
use crate::template::TemplateCache;
use chrono::Utc;
use std::sync::Arc;

/// Owns every registered sink, filter, enricher, and the shared template/capture
/// infrastructure. Cheap to share: callers hold an `Arc<Pipeline>` via [`Logger`]
/// rather than the `Pipeline` itself.
pub struct Pipeline {
    pub(crate) templates: Arc<TemplateCache>,
    pub(crate) capturer: Arc<Capturer>,
    pub(crate) enrichers: Arc<EnricherChain>,
    pub(crate) deadline_enricher: Arc<DeadlineEnricher>,
    pub(crate) filters: Vec<Arc<dyn Filter>>,
    pub(crate) sinks: Vec<(String, Arc<dyn Sink>)>,
    pub(crate) metrics: Arc<PipelineMetrics>,
    pub(crate) selflog: Arc<SelfLog>,
    pub(crate) minimum_level: Level,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn root_logger(self: &Arc<Self>) -> Logger {
        Logger::new(Arc::clone(self), PropertyBag::new())
    }

    /// Runs one event through enrichment, filtering, and dispatch. `fixed_properties`
    /// carries whatever a derived logger (`ForContext`/`With`) has accumulated; it is
    /// merged in after the template's own bindings so a logger-level property can
    /// still be overridden per-call via an identically-named template binding.
    pub(crate) fn process(
        &self,
        level: Level,
        message_template: &str,
        bindings: PropertyBag,
        fixed_properties: &PropertyBag,
    ) {
        if level < self.minimum_level {
            self.metrics.record_filtered();
            return;
        }

        let mut properties = bindings.merge(fixed_properties);
        self.enrichers.enrich_all(&mut properties);

        let event = Event::new(Utc::now(), level, message_template, properties);

        for filter in &self.filters {
            if !filter.allow(&event) {
                self.metrics.record_filtered();
                return;
            }
        }

        self.metrics.record_emitted();
        let shared = Arc::new(event);
        for (id, sink) in &self.sinks {
            if let Err(err) = sink.emit(Arc::clone(&shared)) {
                self.metrics.record_error();
                self.selflog.warn(format!("sink `{}` rejected event: {}", id, err));
            }
        }
    }

    pub fn flush(&self) {
        for (id, sink) in &self.sinks {
            if let Err(err) = sink.flush() {
                self.selflog.warn(format!("sink `{}` failed to flush: {}", id, err));
            }
        }
    }

    pub fn close(&self) {
        for (id, sink) in &self.sinks {
            if let Err(err) = sink.close() {
                self.selflog.warn(format!("sink `{}` failed to close: {}", id, err));
            }
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}
