//! Enrichers add properties to an event before filtering/sampling/capture finalize it.

mod context_values;
mod deadline;
mod otel_trace;
mod process_host;
mod source_context;
mod timestamp;

pub use context_values::{ContextValuesEnricher, DeadlineRequest, EnrichContext};
pub use deadline::{DeadlineConfig, DeadlineEnricher};
pub use otel_trace::{CachingTraceEnricher, FastTraceEnricher, StaticTraceEnricher};
pub use process_host::{HostEnricher, ProcessEnricher};
pub use source_context::SourceContextEnricher;
pub use timestamp::TimestampEnricher;

use crate::event::PropertyBag;

/// An enricher inspects ambient state (clock, process, context) and adds properties to
/// the event's property bag. Enrichers run before filters/sampling so that level
/// overrides and property-expression filters can see enriched properties such as
/// `SourceContext`.
pub trait Enricher: Send + Sync {
    fn enrich(&self, properties: &mut PropertyBag);
}

/// Runs a fixed ordered list of enrichers, in registration order, so a later
/// enricher's `set()` call can deliberately override an earlier one's property (the
/// property bag's last-writer-wins semantics apply here too).
#[derive(Default)]
pub struct EnricherChain {
    enrichers: Vec<Box<dyn Enricher>>,
}

impl EnricherChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enrichers.push(Box::new(enricher));
        self
    }

    pub fn enrich_all(&self, properties: &mut PropertyBag) {
        for enricher in &self.enrichers {
            enricher.enrich(properties);
        }
    }
}
