//! End-to-end scenarios exercising the pipeline through its public surface: template
//! rendering, capturing, sampling tolerances, deadline-driven severity upgrade, OTLP
//! queue admission under a stalled collector, and durable replay after an outage.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use chrono::Utc;
use lumen::capture::{Capture, CapturedValue, Capturer};
use lumen::enrich::EnrichContext;
use lumen::event::PropertyBag;
use lumen::otlp::{OtlpConfig, OtlpSink, Transport};
use lumen::sink::{CollectingSink, DurableSink};
use lumen::template::TemplateTree;
use lumen::{ExportError, Level, Pipeline};

/// S1: a template binds a plain property by name and renders it verbatim.
#[test]
fn template_binds_plain_property_by_name() {
    let tree = TemplateTree::parse("User {UserId} logged in from {City}");
    let mut props = PropertyBag::new();
    props.set("UserId", CapturedValue::Int(42));
    props.set("City", CapturedValue::Str("Cairo".into()));

    let rendered = tree.render(&props);
    assert_eq!(rendered, "User 42 logged in from Cairo");
}

struct OrderConfig {
    retries: u32,
    region: &'static str,
}

impl Capture for OrderConfig {
    fn capture(&self) -> CapturedValue {
        CapturedValue::Struct {
            type_name: "OrderConfig",
            fields: vec![
                ("retries".to_string(), CapturedValue::UInt(self.retries as u64)),
                ("region".to_string(), CapturedValue::Str(self.region.to_string())),
            ],
        }
    }
}

/// S2: the `@` hint destructures a value instead of rendering it as an opaque scalar.
#[test]
fn destructure_hint_captures_structure() {
    let capturer = Capturer::default();
    let config = OrderConfig { retries: 3, region: "eu-west-1" };
    let captured = capturer.capture_destructured(&config);

    match &captured {
        CapturedValue::Struct { type_name, fields } => {
            assert_eq!(*type_name, "OrderConfig");
            assert!(fields.iter().any(|(k, v)| k == "retries" && *v == CapturedValue::UInt(3)));
            assert!(fields.iter().any(|(k, v)| k == "region" && *v == CapturedValue::Str("eu-west-1".into())));
        }
        other => panic!("expected a destructured struct, got {other:?}"),
    }

    let tree = TemplateTree::parse("Config: {@Config}");
    let mut props = PropertyBag::new();
    props.set("Config", captured);
    let rendered = tree.render(&props);
    assert!(rendered.contains("retries: 3"));
    assert!(rendered.contains("region: eu-west-1"));
}

/// S3: a rate sampler admits roughly its configured fraction over many events — a
/// statistical tolerance, not an exact count, since the decision is a coin flip.
#[test]
fn rate_sampler_admits_within_statistical_tolerance() {
    let collector = Arc::new(CollectingSink::new());
    let pipeline = Pipeline::builder()
        .minimum_level(Level::Verbose)
        .filter_with(Arc::new(lumen::sampling::SamplingFilter::new(
            Arc::new(lumen::sampling::RatePolicy::new(0.5)) as Arc<dyn lumen::sampling::SamplingPolicy>
        )))
        .sink("collector", collector.clone())
        .unwrap()
        .build()
        .unwrap();
    let logger = Arc::new(pipeline).root_logger();

    for i in 0i64..1000i64 {
        logger.information("tick {N}", {
            let mut p = PropertyBag::new();
            p.set("N", CapturedValue::Int(i));
            p
        });
    }

    let accepted = collector.len();
    assert!((400..=600).contains(&accepted), "expected ~500 of 1000 events at rate 0.5, got {accepted}");
}

/// S4: a counter sampler admits exactly every Nth event — the first of every N, per the
/// 1-indexed "first of every N" convention (events 1, 11, 21, ... out of 100 at N=10).
#[test]
fn counter_sampler_admits_exact_count() {
    let collector = Arc::new(CollectingSink::new());
    let pipeline = Pipeline::builder()
        .minimum_level(Level::Verbose)
        .filter_with(Arc::new(lumen::sampling::SamplingFilter::new(
            Arc::new(lumen::sampling::CounterPolicy::new(10)) as Arc<dyn lumen::sampling::SamplingPolicy>
        )))
        .sink("collector", collector.clone())
        .unwrap()
        .build()
        .unwrap();
    let logger = Arc::new(pipeline).root_logger();

    for i in 0i64..100i64 {
        logger.information("tick {N}", {
            let mut p = PropertyBag::new();
            p.set("N", CapturedValue::Int(i));
            p
        });
    }

    assert_eq!(collector.len(), 10, "counter sampler at N=10 over 100 events must admit exactly 10");
}

/// S5: an event logged close to its deadline is flagged `deadline.approaching` and
/// upgraded from Information to Warning, with `deadline.first_warning` set only once
/// per key even across repeated calls past the same deadline.
#[test]
fn deadline_enricher_upgrades_severity_once_per_key() {
    let collector = Arc::new(CollectingSink::new());
    let pipeline = Pipeline::builder()
        .minimum_level(Level::Verbose)
        .deadline_config(lumen::enrich::DeadlineConfig {
            threshold: Duration::from_millis(100),
            percentage_threshold: None,
            upgrade_level: true,
        })
        .sink("collector", collector.clone())
        .unwrap()
        .build()
        .unwrap();
    let logger = Arc::new(pipeline).root_logger();

    let start = Utc::now();
    let deadline = start + chrono::Duration::milliseconds(50);
    let ctx = EnrichContext::new().with_deadline("checkout.process", start, deadline);

    logger.information_ctx("processing order", PropertyBag::new(), &ctx);
    logger.information_ctx("processing order, still going", PropertyBag::new(), &ctx);

    let events = collector.events();
    assert_eq!(events.len(), 2);

    let first = &events[0];
    assert_eq!(first.level, Level::Warning, "an Information event within the deadline threshold must be upgraded to Warning");
    assert_eq!(first.property("deadline.approaching"), Some(&CapturedValue::Bool(true)));
    assert_eq!(first.property("deadline.first_warning"), Some(&CapturedValue::Bool(true)));
    match first.property("deadline.remaining_ms") {
        Some(CapturedValue::Int(ms)) => assert!(*ms > 0 && *ms <= 100, "remaining_ms out of expected (0, 100] range: {ms}"),
        other => panic!("expected deadline.remaining_ms to be an Int, got {other:?}"),
    }

    let second = &events[1];
    assert_eq!(second.level, Level::Warning);
    assert_eq!(second.property("deadline.approaching"), Some(&CapturedValue::Bool(true)));
    assert!(
        second.property("deadline.first_warning").is_none(),
        "a second event against the same key must not re-flag first_warning"
    );
}

/// A transport that blocks inside `export` until the test releases it, then reports the
/// collector as unreachable — used to hold the OTLP sink's worker thread busy long
/// enough for a producer burst to overflow the bounded channel deterministically.
struct GatedTransport {
    blocked: Mutex<bool>,
    cv: Condvar,
}

impl GatedTransport {
    fn new() -> Self {
        Self {
            blocked: Mutex::new(true),
            cv: Condvar::new(),
        }
    }

    fn release(&self) {
        let mut guard = self.blocked.lock().unwrap();
        *guard = false;
        self.cv.notify_all();
    }
}

impl Transport for GatedTransport {
    fn export(&self, _records: Vec<opentelemetry_proto::tonic::logs::v1::LogRecord>) -> Result<(), ExportError> {
        let mut guard = self.blocked.lock().unwrap();
        while *guard {
            guard = self.cv.wait(guard).unwrap();
        }
        Err(ExportError::Transport("collector unreachable".into()))
    }
}

/// S6: with no collector reachable, the sink admits at most `maxQueueSize` events and
/// drops the rest with a queue-full reason, reflected in the dropped counter.
#[test]
fn otlp_sink_drops_overflow_while_collector_is_unreachable() {
    let transport = Arc::new(GatedTransport::new());
    let mut config = OtlpConfig::default();
    config.batch_size = 10;
    config.batch_timeout = Duration::from_secs(3600);
    config.max_queue_size = 100;
    config.retry_initial_interval = Duration::from_millis(1);
    config.retry_max_interval = Duration::from_millis(5);
    config.retry_max_elapsed_time = Duration::from_millis(10);

    let sink = OtlpSink::with_transport(config, transport.clone());

    // The worker blocks inside `export` after its first full batch (10 events), well
    // before this burst finishes, so the channel fills to `max_queue_size` and the
    // remainder is rejected synchronously by `try_send`.
    let mut accepted = 0u64;
    let mut rejected = 0u64;
    for i in 0i64..20_000i64 {
        let event = Arc::new(lumen::Event::new(Utc::now(), Level::Information, "burst {N}", {
            let mut p = PropertyBag::new();
            p.set("N", CapturedValue::Int(i));
            p
        }));
        match sink.emit(event) {
            Ok(()) => accepted += 1,
            Err(_) => rejected += 1,
        }
    }

    assert_eq!(accepted + rejected, 20_000);
    assert_eq!(rejected, sink.dropped_count());
    assert!(
        rejected >= 19_000,
        "expected the overwhelming majority of the burst to be dropped while the worker was blocked exporting, got {rejected} dropped"
    );
    assert!(accepted <= 110, "accepted should be bounded near max_queue_size (100) plus the one in-flight batch, got {accepted}");

    let metrics = sink.get_metrics();
    assert!(metrics.iter().any(|(name, value)| name == "lumen_otlp_sink_capacity" && *value == 100));

    transport.release();
    sink.close().unwrap();
}

/// S7: events written while the downstream sink is unavailable are persisted to disk
/// and replayed once it recovers; the on-disk segment backlog drains to zero.
#[test]
fn durable_sink_replays_backlog_after_downstream_recovers() {
    struct FlakySink {
        blocked: Arc<Mutex<bool>>,
        received: Mutex<Vec<Arc<lumen::Event>>>,
    }

    impl lumen::sink::Sink for FlakySink {
        fn emit(&self, event: Arc<lumen::Event>) -> Result<(), lumen::SinkError> {
            let guard = self.blocked.lock().unwrap();
            if *guard {
                return Err(lumen::SinkError::Closed);
            }
            drop(guard);
            self.received.lock().unwrap().push(event);
            Ok(())
        }
    }

    let blocked = Arc::new(Mutex::new(true));
    let inner = Arc::new(FlakySink {
        blocked: blocked.clone(),
        received: Mutex::new(Vec::new()),
    });

    let dir = tempfile::tempdir().unwrap();
    let retry_interval = Duration::from_millis(50);
    let durable = DurableSink::new(dir.path().to_path_buf(), inner.clone(), 1 << 20, 10_000, 32, retry_interval).unwrap();

    // Downstream is unavailable: each `emit` tries the fast path to `inner` first, gets
    // rejected, and falls back to writing the event ahead to disk instead.
    for i in 0i64..500i64 {
        let event = Arc::new(lumen::Event::new(Utc::now(), Level::Information, "queued {N}", {
            let mut p = PropertyBag::new();
            p.set("N", CapturedValue::Int(i));
            p
        }));
        durable.emit(event).unwrap();
    }

    std::thread::sleep(Duration::from_secs(2));
    assert_eq!(inner.received.lock().unwrap().len(), 0, "nothing should have reached the inner sink while it was blocked");

    *blocked.lock().unwrap() = false;

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if inner.received.lock().unwrap().len() >= 500 {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "not all 500 events replayed within the retry window");
        std::thread::sleep(Duration::from_millis(20));
    }

    // A fresh (empty) segment file always exists to receive the next write, so "no
    // backlog remains" means every on-disk segment is empty, not that zero files exist.
    let backlog_segments = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("seg"))
        .filter(|p| std::fs::metadata(p).map(|m| m.len() > 0).unwrap_or(false))
        .count();
    assert_eq!(backlog_segments, 0, "all backlog segments should have been replayed and removed");

    durable.close().unwrap();
}
