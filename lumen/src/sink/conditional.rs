//! Wraps a sink so it only receives events a predicate admits — the sink-level
//! counterpart to [`crate::filter::Filter`], for routing decisions that depend on the
//! destination rather than on whether the event should be logged at all.

use super::Sink;
use crate::error::SinkError;
use crate::event::Event;
use std::sync::Arc;

pub struct ConditionalSink {
    inner: Arc<dyn Sink>,
    predicate: Box<dyn Fn(&Event) -> bool + Send + Sync>,
}

impl ConditionalSink {
    pub fn new(inner: Arc<dyn Sink>, predicate: impl Fn(&Event) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner,
            predicate: Box::new(predicate),
        }
    }
}

impl Sink for ConditionalSink {
    fn emit(&self, event: Arc<Event>) -> Result<(), SinkError> {
        if (self.predicate)(&event) {
            self.inner.emit(event)
        } else {
            Ok(())
        }
    }

    fn close(&self) -> Result<(), SinkError> {
        self.inner.close()
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush()
    }

    fn health_check(&self) -> bool {
        self.inner.health_check()
    }

    fn get_metrics(&self) -> Vec<(String, u64)> {
        self.inner.get_metrics()
    }
}
