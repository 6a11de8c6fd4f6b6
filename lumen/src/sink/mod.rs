//! The `Sink` contract and the wrapper sinks (async, durable, conditional, router)
//! built on top of it.

mod async_sink;
mod conditional;
mod durable;
mod router;

pub use async_sink::{AsyncSink, OverflowStrategy};
pub use conditional::ConditionalSink;
pub use durable::DurableSink;
pub use router::{RouteMode, RouterSink};

use crate::error::SinkError;
use crate::event::Event;
use std::sync::Arc;

/// A destination for events. Mirrors the teacher's `LogListener` trait, generalized
/// with an explicit error type and the health/metrics hooks the spec calls for.
///
/// `emit` is fire-and-forget: it may enqueue the event for later processing (as the
/// async/durable/OTLP sinks do) rather than completing the underlying write before
/// returning.
pub trait Sink: Send + Sync {
    fn emit(&self, event: Arc<Event>) -> Result<(), SinkError>;

    fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn health_check(&self) -> bool {
        true
    }

    fn get_metrics(&self) -> Vec<(String, u64)> {
        Vec::new()
    }
}

/// A sink that discards every event. Useful as a default/placeholder and in tests.
pub struct NullSink;

impl Sink for NullSink {
    fn emit(&self, _event: Arc<Event>) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Collects every event it receives, for tests that need to assert on pipeline output.
#[derive(Default)]
pub struct CollectingSink {
    events: parking_lot::Mutex<Vec<Arc<Event>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Arc<Event>> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Sink for CollectingSink {
    fn emit(&self, event: Arc<Event>) -> Result<(), SinkError> {
        self.events.lock().push(event);
        Ok(())
    }
}
