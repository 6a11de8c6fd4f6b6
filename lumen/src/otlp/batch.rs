//! Size/timeout batching for OTLP export, grounded on the teacher's
//! `BatchedBufferLayer`/`flush_batch`: accumulate up to a fixed batch size, flush
//! immediately when full, and flush whatever is pending on a periodic interval so a
//! low-traffic period doesn't hold events indefinitely.

use crate::event::Event;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Batcher {
    batch_size: usize,
    batch_timeout: Duration,
    pending: Vec<Arc<Event>>,
    last_flush: Instant,
}

impl Batcher {
    pub fn new(batch_size: usize, batch_timeout: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_timeout,
            pending: Vec::with_capacity(batch_size.max(1)),
            last_flush: Instant::now(),
        }
    }

    /// Adds `event`, returning a full batch to flush if the size threshold was hit.
    pub fn push(&mut self, event: Arc<Event>) -> Option<Vec<Arc<Event>>> {
        self.pending.push(event);
        if self.pending.len() >= self.batch_size {
            Some(self.take())
        } else {
            None
        }
    }

    /// Returns a batch to flush if the timeout has elapsed and there's anything
    /// pending; called by the export worker's poll loop between `push` calls.
    pub fn poll_timeout(&mut self) -> Option<Vec<Arc<Event>>> {
        if !self.pending.is_empty() && self.last_flush.elapsed() >= self.batch_timeout {
            Some(self.take())
        } else {
            None
        }
    }

    pub fn take(&mut self) -> Vec<Arc<Event>> {
        self.last_flush = Instant::now();
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use crate::event::{Level, PropertyBag};
    use chrono::Utc;

    fn event() -> Arc<Event> {
        Arc::new(Event::new(Utc::now(), Level::Information, "m", PropertyBag::new()))
    }

    #[test]
    fn flushes_when_batch_size_reached() {
        let mut batcher = Batcher::new(2, Duration::from_secs(60));
        assert!(batcher.push(event()).is_none());
        let batch = batcher.push(event()).expect("should flush at size 2");
        assert_eq!(batch.len(), 2);
        assert!(batcher.is_empty());
    }

    #[test]
    fn poll_timeout_flushes_partial_batch_after_elapsed() {
        let mut batcher = Batcher::new(100, Duration::from_millis(10));
        batcher.push(event());
        assert!(batcher.poll_timeout().is_none());
        std::thread::sleep(Duration::from_millis(20));
        let batch = batcher.poll_timeout().expect("should flush after timeout");
        assert_eq!(batch.len(), 1);
    }
}
