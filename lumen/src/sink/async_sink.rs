//! Wraps an inner sink with a bounded queue and a background worker pool, so that a
//! slow downstream sink doesn't stall the calling thread.
//!
//! Grounded directly on the teacher's channel-plus-dedicated-thread dispatch
//! (`ttlog::trace::Trace::init`/`writer_loop`); the `DropOldest` overflow strategy
//! reuses the teacher's `LockFreeRingBuffer::push` evict-then-insert technique instead
//! of a plain channel, since a channel alone has no way to discard its own oldest
//! entry.

use super::Sink;
use crate::error::SinkError;
use crate::event::Event;
use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowStrategy {
    /// Blocks the calling thread until the queue has room.
    Block,
    /// Drops the new event immediately if the queue is full.
    Drop,
    /// Evicts the oldest queued event to make room for the new one.
    DropOldest,
}

enum Transport {
    /// Wrapped in an `Option` so `close` can actually drop the sender: the workers'
    /// `recv()` loop only ever exits once every sender handle is gone, and `close`
    /// only has `&self` to work with.
    Channel(Mutex<Option<crossbeam_channel::Sender<Arc<Event>>>>),
    Ring(Arc<ArrayQueue<Arc<Event>>>),
}

pub struct AsyncSink {
    transport: Transport,
    strategy: OverflowStrategy,
    capacity: usize,
    dropped: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl AsyncSink {
    pub fn new(inner: Arc<dyn Sink>, capacity: usize, strategy: OverflowStrategy, worker_count: usize) -> Self {
        let dropped = Arc::new(AtomicU64::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        match strategy {
            OverflowStrategy::Block | OverflowStrategy::Drop => {
                let (sender, receiver) = crossbeam_channel::bounded::<Arc<Event>>(capacity);
                let workers = (0..worker_count.max(1))
                    .map(|_| {
                        let receiver = receiver.clone();
                        let inner = Arc::clone(&inner);
                        std::thread::spawn(move || {
                            while let Ok(event) = receiver.recv() {
                                let _ = inner.emit(event);
                            }
                        })
                    })
                    .collect();
                Self {
                    transport: Transport::Channel(Mutex::new(Some(sender))),
                    strategy,
                    capacity,
                    dropped,
                    shutdown,
                    workers,
                }
            }
            OverflowStrategy::DropOldest => {
                let ring = Arc::new(ArrayQueue::new(capacity.max(1)));
                let worker_ring = Arc::clone(&ring);
                let worker_shutdown = Arc::clone(&shutdown);
                let handle = std::thread::spawn(move || loop {
                    match worker_ring.pop() {
                        Some(event) => {
                            let _ = inner.emit(event);
                        }
                        None => {
                            if worker_shutdown.load(Ordering::Acquire) {
                                break;
                            }
                            std::thread::sleep(Duration::from_millis(1));
                        }
                    }
                });
                Self {
                    transport: Transport::Ring(ring),
                    strategy,
                    capacity,
                    dropped,
                    shutdown,
                    workers: vec![handle],
                }
            }
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Sink for AsyncSink {
    fn emit(&self, event: Arc<Event>) -> Result<(), SinkError> {
        match &self.transport {
            Transport::Channel(sender) => {
                let guard = sender.lock();
                let Some(sender) = guard.as_ref() else {
                    return Err(SinkError::Closed);
                };
                match self.strategy {
                    OverflowStrategy::Block => sender.send(event).map_err(|_| SinkError::Closed),
                    OverflowStrategy::Drop => match sender.try_send(event) {
                        Ok(()) => Ok(()),
                        Err(crossbeam_channel::TrySendError::Full(_)) => {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                            Ok(())
                        }
                        Err(crossbeam_channel::TrySendError::Disconnected(_)) => Err(SinkError::Closed),
                    },
                    OverflowStrategy::DropOldest => unreachable!("DropOldest uses the ring transport"),
                }
            }
            Transport::Ring(ring) => {
                if let Err(rejected) = ring.push(event) {
                    // Full: evict the oldest entry to make room. If that entry existed
                    // it's genuinely dropped, whether or not the retry below succeeds.
                    if ring.pop().is_some() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    // Retry once; a concurrent producer may have refilled the freed
                    // slot first, in which case the new event is the one dropped.
                    if ring.push(rejected).is_err() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Ok(())
            }
        }
    }

    fn close(&self) -> Result<(), SinkError> {
        self.shutdown.store(true, Ordering::Release);
        match &self.transport {
            // Taking the sender out (rather than cloning and dropping the clone)
            // drops the last outstanding handle, which is what actually makes the
            // workers' `recv()` loop return `Err` once the channel drains.
            Transport::Channel(sender) => *sender.lock() = None,
            Transport::Ring(_) => {}
        }
        Ok(())
    }

    fn get_metrics(&self) -> Vec<(String, u64)> {
        vec![
            ("lumen_async_sink_capacity".to_string(), self.capacity as u64),
            ("lumen_async_sink_dropped_total".to_string(), self.dropped_count()),
        ]
    }
}

impl Drop for AsyncSink {
    fn drop(&mut self) {
        // Workers block on `recv()`/poll their queue; joining them without first
        // closing the transport would hang forever if the caller never called
        // `close()` explicitly.
        let _ = Sink::close(&*self);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
