//! Diagnostics about the logging pipeline itself, as distinct from the events it
//! carries: a self-log channel for "a sink rejected an event" style messages, and a
//! small Prometheus exposition server for sink/sampling metrics.
//!
//! Grounded on the teacher's own best-effort `eprintln!("[Tag] message")` diagnostics
//! (`ttlog::trace`, `ttlog::trace_layer`, `ttlog::panic_hook`) — `SelfLog` generalizes
//! that pattern into a toggleable, capturable channel instead of an unconditional
//! `eprintln!`, since a logging library's own failures still need somewhere to go.

mod prometheus_exporter;

pub use prometheus_exporter::PrometheusExporter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A diagnostic message emitted by the pipeline about its own operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfLogLevel {
    Warn,
    Error,
}

type Sink = dyn Fn(SelfLogLevel, &str) + Send + Sync;

/// Process-wide diagnostic channel for the logging pipeline's own failures — never
/// carries user event data. Disabled by default (messages are dropped); `enabled`
/// writes to stderr with the teacher's `[Tag] message` bracket style, and `with_sink`
/// lets a caller capture messages instead (e.g. in a test, or to forward into their
/// own separate monitoring path).
pub struct SelfLog {
    active: AtomicBool,
    sink: Mutex<Option<Arc<Sink>>>,
}

impl SelfLog {
    pub fn disabled() -> Self {
        Self {
            active: AtomicBool::new(false),
            sink: Mutex::new(None),
        }
    }

    /// Writes diagnostics to stderr, prefixed the way the teacher's own modules do.
    pub fn enabled() -> Self {
        Self {
            active: AtomicBool::new(true),
            sink: Mutex::new(None),
        }
    }

    /// Routes diagnostics to a custom sink instead of stderr, e.g. so tests can assert
    /// on self-log output without scraping stderr.
    pub fn with_sink(sink: impl Fn(SelfLogLevel, &str) + Send + Sync + 'static) -> Self {
        Self {
            active: AtomicBool::new(true),
            sink: Mutex::new(Some(Arc::new(sink))),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(SelfLogLevel::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.emit(SelfLogLevel::Error, message.as_ref());
    }

    fn emit(&self, level: SelfLogLevel, message: &str) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        let sink = self.sink.lock().expect("selflog sink mutex poisoned").clone();
        match sink {
            Some(sink) => sink(level, message),
            None => {
                let tag = match level {
                    SelfLogLevel::Warn => "Lumen/Warn",
                    SelfLogLevel::Error => "Lumen/Error",
                };
                eprintln!("[{}] {}", tag, message);
            }
        }
    }
}

impl Default for SelfLog {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn disabled_selflog_drops_messages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let log = SelfLog::with_sink(move |_, _| {
            calls_clone.fetch_add(1, Ordering::Relaxed);
        });
        log.set_active(false);
        log.warn("should not be delivered");
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn custom_sink_receives_messages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let log = SelfLog::with_sink(move |level, msg| {
            assert_eq!(level, SelfLogLevel::Warn);
            assert_eq!(msg, "hello");
            calls_clone.fetch_add(1, Ordering::Relaxed);
        });
        log.warn("hello");
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
