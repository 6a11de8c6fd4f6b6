//! Fluent construction of a [`super::Pipeline`]; the only place [`ConfigError`] is
//! produced.

use crate::capture::Capturer;
use crate::enrich::{DeadlineConfig, DeadlineEnricher, EnricherChain};
use crate::error::ConfigError;
use crate::event::{Level, PipelineMetrics};
use crate::filter::Filter;
use crate::observability::SelfLog;
use crate::pipeline::Pipeline;
use crate::sink::Sink;
use crate::template::TemplateCache;
use std::collections::HashSet;
use std::sync::Arc;

pub struct PipelineBuilder {
    minimum_level: Level,
    template_cache_capacity: usize,
    enrichers: EnricherChain,
    deadline_config: DeadlineConfig,
    deadline_cache_capacity: usize,
    filters: Vec<Arc<dyn Filter>>,
    sinks: Vec<(String, Arc<dyn Sink>)>,
    capturer: Capturer,
    selflog: SelfLog,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            minimum_level: Level::Information,
            template_cache_capacity: 4096,
            enrichers: EnricherChain::new(),
            deadline_config: DeadlineConfig::default(),
            deadline_cache_capacity: 1024,
            filters: Vec::new(),
            sinks: Vec::new(),
            capturer: Capturer::default(),
            selflog: SelfLog::disabled(),
        }
    }

    pub fn minimum_level(mut self, level: Level) -> Self {
        self.minimum_level = level;
        self
    }

    pub fn template_cache_capacity(mut self, capacity: usize) -> Self {
        self.template_cache_capacity = capacity;
        self
    }

    pub fn enrich_with(mut self, enricher: impl crate::enrich::Enricher + 'static) -> Self {
        self.enrichers = self.enrichers.push(enricher);
        self
    }

    /// Configures the deadline-awareness enricher invoked by the `*_ctx` logger methods
    /// when a call attaches an [`crate::enrich::EnrichContext`] with a deadline.
    pub fn deadline_config(mut self, config: DeadlineConfig) -> Self {
        self.deadline_config = config;
        self
    }

    pub fn deadline_cache_capacity(mut self, capacity: usize) -> Self {
        self.deadline_cache_capacity = capacity;
        self
    }

    pub fn filter_with(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_capturer(mut self, capturer: Capturer) -> Self {
        self.capturer = capturer;
        self
    }

    pub fn selflog(mut self, selflog: SelfLog) -> Self {
        self.selflog = selflog;
        self
    }

    /// Registers a sink under `id`. Sink ids must be unique; a duplicate id is a
    /// [`ConfigError::DuplicateSink`].
    pub fn sink(mut self, id: impl Into<String>, sink: Arc<dyn Sink>) -> Result<Self, ConfigError> {
        let id = id.into();
        if self.sinks.iter().any(|(existing, _)| *existing == id) {
            return Err(ConfigError::DuplicateSink(id));
        }
        self.sinks.push((id, sink));
        Ok(self)
    }

    pub fn build(self) -> Result<Pipeline, ConfigError> {
        let mut seen_ids = HashSet::new();
        for (id, _) in &self.sinks {
            if !seen_ids.insert(id.clone()) {
                return Err(ConfigError::DuplicateSink(id.clone()));
            }
        }

        Ok(Pipeline {
            templates: Arc::new(TemplateCache::new(self.template_cache_capacity)),
            capturer: Arc::new(self.capturer),
            enrichers: Arc::new(self.enrichers),
            deadline_enricher: Arc::new(DeadlineEnricher::new(self.deadline_cache_capacity, self.deadline_config)),
            filters: self.filters,
            sinks: self.sinks,
            metrics: Arc::new(PipelineMetrics::default()),
            selflog: Arc::new(self.selflog),
            minimum_level: self.minimum_level,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
