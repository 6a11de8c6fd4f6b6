//! The immutable event model: severity levels, the ordered property bag, and the
//! [`Event`] type that flows from the pipeline into every sink.

mod properties;

pub use properties::PropertyBag;

use crate::capture::CapturedValue;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Event severity, ordered from least to most severe. The discriminant values double
/// as the packed metadata representation (see [`pack_meta`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Verbose = 0,
    Debug = 1,
    Information = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Level::Verbose),
            1 => Some(Level::Debug),
            2 => Some(Level::Information),
            3 => Some(Level::Warning),
            4 => Some(Level::Error),
            5 => Some(Level::Fatal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Level::Verbose => "VRB",
            Level::Debug => "DBG",
            Level::Information => "INF",
            Level::Warning => "WRN",
            Level::Error => "ERR",
            Level::Fatal => "FTL",
        };
        f.write_str(s)
    }
}

/// Packs a `(timestamp_millis, level)` pair into a single `u64`: the low 4 bits carry
/// the level, the remaining bits carry milliseconds since the Unix epoch. This is the
/// same bit-packing technique used for the teacher's per-event metadata word, reused
/// here for the same reason — it lets admission-path code compare/sort events by
/// `(time, level)` with a single integer compare instead of a field-by-field one.
pub fn pack_meta(timestamp_millis: u64, level: Level) -> u64 {
    (timestamp_millis << 4) | (level as u64 & 0xF)
}

pub fn unpack_meta(packed: u64) -> (u64, Level) {
    let level = Level::from_u8((packed & 0xF) as u8).unwrap_or(Level::Information);
    (packed >> 4, level)
}

/// A captured exception/error attached to an event, if any.
#[derive(Debug, Clone)]
pub struct CapturedException {
    pub message: String,
    pub type_name: String,
    pub stack_trace: Option<String>,
}

/// An immutable log event produced by the pipeline and handed to every sink.
///
/// `Event` is cheap to clone (template/message are `Arc`-shared) and safe to hold
/// across threads; sinks that need to retain events past `emit()` returning should
/// wrap them in `Arc<Event>` (the async/durable/OTLP batch paths already do this).
#[derive(Debug, Clone)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message_template: Arc<str>,
    pub properties: PropertyBag,
    pub exception: Option<CapturedException>,
    render_cache: Arc<OnceCell<String>>,
}

impl Event {
    pub fn new(
        timestamp: DateTime<Utc>,
        level: Level,
        message_template: impl Into<Arc<str>>,
        properties: PropertyBag,
    ) -> Self {
        Self {
            timestamp,
            level,
            message_template: message_template.into(),
            properties,
            exception: None,
            render_cache: Arc::new(OnceCell::new()),
        }
    }

    pub fn with_exception(mut self, exception: CapturedException) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Renders the message template against this event's properties, memoizing the
    /// result the first time it's requested — an event may be rendered once per sink,
    /// and each sink should pay the rendering cost at most once in aggregate.
    pub fn render(&self, templates: &crate::template::TemplateCache) -> Arc<str> {
        let rendered = self.render_cache.get_or_init(|| {
            let tree = templates.parse(&self.message_template);
            tree.render(&self.properties)
        });
        Arc::from(rendered.as_str())
    }

    pub fn property(&self, name: &str) -> Option<&CapturedValue> {
        self.properties.get(name)
    }
}

/// Aggregate counters tracked across the lifetime of a pipeline, following the same
/// atomics-plus-helper-methods shape as the teacher's per-event metrics struct.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    events_emitted: std::sync::atomic::AtomicU64,
    events_filtered: std::sync::atomic::AtomicU64,
    events_sampled_out: std::sync::atomic::AtomicU64,
    events_errored: std::sync::atomic::AtomicU64,
    total_capture_time_ns: std::sync::atomic::AtomicU64,
}

impl PipelineMetrics {
    pub fn record_emitted(&self) {
        self.events_emitted
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.events_filtered
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn record_sampled_out(&self) {
        self.events_sampled_out
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.events_errored
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn record_capture_time(&self, nanos: u64) {
        self.total_capture_time_ns
            .fetch_add(nanos, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn emitted(&self) -> u64 {
        self.events_emitted.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.events_filtered.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn sampled_out(&self) -> u64 {
        self.events_sampled_out
            .load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn errored(&self) -> u64 {
        self.events_errored.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn avg_capture_time_ns(&self) -> f64 {
        let total = self.emitted();
        if total == 0 {
            return 0.0;
        }
        self.total_capture_time_ns.load(std::sync::atomic::Ordering::Relaxed) as f64 / total as f64
    }

    /// The documented external exposition names: `mtlog_events_total`,
    /// `mtlog_errors_total`, `mtlog_dropped_total`, `mtlog_latency_milliseconds`.
    /// `dropped` counts events that never reached a sink (filtered by level/predicate
    /// or sampled out); `errors` counts sink rejections, which still reached dispatch.
    pub fn to_prometheus(&self) -> Vec<(String, u64)> {
        vec![
            ("mtlog_events_total".to_string(), self.emitted()),
            ("mtlog_errors_total".to_string(), self.errored()),
            ("mtlog_dropped_total".to_string(), self.filtered() + self.sampled_out()),
            (
                "mtlog_latency_milliseconds".to_string(),
                (self.avg_capture_time_ns() / 1_000_000.0) as u64,
            ),
        ]
    }
}
