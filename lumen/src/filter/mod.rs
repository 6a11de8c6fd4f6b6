//! Event filters: predicates evaluated after enrichment but before sampling/capture.

mod composite;
mod level;
mod rate_limit;
mod sampling_hash;

pub use composite::{all_of, any_of, not, Composite};
pub use level::LevelFilter;
pub use rate_limit::RateLimitFilter;
pub use sampling_hash::HashSamplingFilter;

use crate::event::Event;

/// A filter decides whether an already-enriched event continues through the pipeline.
/// Filters are pure/stateless from the caller's perspective even though several
/// (rate-limit, hash-sampling) carry internal atomics.
pub trait Filter: Send + Sync {
    fn allow(&self, event: &Event) -> bool;
}

impl<F: Fn(&Event) -> bool + Send + Sync> Filter for F {
    fn allow(&self, event: &Event) -> bool {
        self(event)
    }
}

/// Evaluates a boolean property expression such as `StatusCode >= 500`.
///
/// Kept intentionally small: the spec's CORE only needs simple comparisons against a
/// named property, not a general expression language (that belongs to the excluded
/// config-loader surface, which would compile a richer DSL down to this shape).
pub struct PropertyExpressionFilter {
    property: String,
    op: ComparisonOp,
    operand: crate::capture::CapturedValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl PropertyExpressionFilter {
    pub fn new(property: impl Into<String>, op: ComparisonOp, operand: crate::capture::CapturedValue) -> Self {
        Self {
            property: property.into(),
            op,
            operand,
        }
    }

    fn compare_numeric(a: f64, b: f64, op: ComparisonOp) -> bool {
        match op {
            ComparisonOp::Eq => a == b,
            ComparisonOp::Ne => a != b,
            ComparisonOp::Lt => a < b,
            ComparisonOp::Le => a <= b,
            ComparisonOp::Gt => a > b,
            ComparisonOp::Ge => a >= b,
        }
    }

    fn as_f64(value: &crate::capture::CapturedValue) -> Option<f64> {
        use crate::capture::CapturedValue::*;
        match value {
            Int(i) => Some(*i as f64),
            UInt(u) => Some(*u as f64),
            Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl Filter for PropertyExpressionFilter {
    fn allow(&self, event: &Event) -> bool {
        let Some(actual) = event.property(&self.property) else {
            return false;
        };
        match (Self::as_f64(actual), Self::as_f64(&self.operand)) {
            (Some(a), Some(b)) => Self::compare_numeric(a, b, self.op),
            _ => match self.op {
                ComparisonOp::Eq => actual == &self.operand,
                ComparisonOp::Ne => actual != &self.operand,
                _ => false,
            },
        }
    }
}

/// Wraps an arbitrary `Fn(&Event) -> bool` as a predicate filter, for callers that
/// don't need anything named above.
pub struct PredicateFilter<F: Fn(&Event) -> bool + Send + Sync> {
    predicate: F,
}

impl<F: Fn(&Event) -> bool + Send + Sync> PredicateFilter<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F: Fn(&Event) -> bool + Send + Sync> Filter for PredicateFilter<F> {
    fn allow(&self, event: &Event) -> bool {
        (self.predicate)(event)
    }
}
