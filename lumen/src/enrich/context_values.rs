//! Copies caller-supplied ambient context values (and an optional deadline) onto the
//! event.
//!
//! Context is threaded explicitly through the `*_ctx` logger methods rather than
//! smuggled through the property map under a reserved key — see `SPEC_FULL.md` §6 for
//! why the reserved-property-key approach was rejected in favor of an explicit
//! parameter.

use super::Enricher;
use crate::capture::CapturedValue;
use crate::event::PropertyBag;
use chrono::{DateTime, Utc};

/// A deadline attached to a single log call (or a derived logger). `key` identifies the
/// logical operation so the deadline enricher's first-warning bookkeeping is shared
/// across repeated calls for the same operation; `start`/`at` bound its time budget.
#[derive(Debug, Clone)]
pub struct DeadlineRequest {
    pub key: String,
    pub start: DateTime<Utc>,
    pub at: DateTime<Utc>,
}

/// Ambient values a caller can attach to a single log call (or a `with_context`
/// logger) without writing them into the message template.
#[derive(Debug, Clone, Default)]
pub struct EnrichContext {
    pub deadline: Option<DeadlineRequest>,
    pub values: Vec<(String, CapturedValue)>,
}

impl EnrichContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, key: impl Into<String>, start: DateTime<Utc>, at: DateTime<Utc>) -> Self {
        self.deadline = Some(DeadlineRequest {
            key: key.into(),
            start,
            at,
        });
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: CapturedValue) -> Self {
        self.values.push((key.into(), value));
        self
    }
}

/// Applies an [`EnrichContext`]'s well-known values (excluding the deadline, which the
/// pipeline handles separately since it can upgrade the event's level) to the property
/// bag. Unlike the other enrichers in this module, this one is parameterized per log
/// call rather than built once and reused — it's invoked directly by the pipeline's
/// `*_ctx` methods rather than registered in an [`super::EnricherChain`].
pub struct ContextValuesEnricher<'a> {
    context: &'a EnrichContext,
}

impl<'a> ContextValuesEnricher<'a> {
    pub fn new(context: &'a EnrichContext) -> Self {
        Self { context }
    }
}

impl Enricher for ContextValuesEnricher<'_> {
    fn enrich(&self, properties: &mut PropertyBag) {
        for (key, value) in &self.context.values {
            properties.set(key.clone(), value.clone());
        }
    }
}
