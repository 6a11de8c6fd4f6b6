use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lumen::capture::CapturedValue;
use lumen::sink::NullSink;
use lumen::template::TemplateCache;
use lumen::{Level, Pipeline, PropertyBag};
use std::sync::Arc;
use std::time::Duration;

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

fn bench_template_parse_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("template");
    let cache = TemplateCache::new(64);

    group.bench_function("parse_cold", |b| {
        b.iter(|| TemplateCache::new(64).parse("User {UserId} placed order {@Order} in {Elapsed,10:F2}ms"));
    });

    group.bench_function("parse_cached", |b| {
        b.iter(|| cache.parse("User {UserId} placed order {@Order} in {Elapsed,10:F2}ms"));
    });

    let tree = cache.parse("User {UserId} placed order {@Order} in {Elapsed,10:F2}ms");
    let mut props = PropertyBag::new();
    props.set("UserId", CapturedValue::Int(42));
    props.set("Elapsed", CapturedValue::Float(12.3456));
    group.bench_function("render", |b| {
        b.iter(|| tree.render(&props));
    });

    group.finish();
}

fn bench_pipeline_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_dispatch");

    for sink_count in [1usize, 4, 16] {
        let mut builder = Pipeline::builder().minimum_level(Level::Verbose);
        for i in 0..sink_count {
            builder = builder.sink(format!("null-{i}"), Arc::new(NullSink)).unwrap();
        }
        let pipeline = Arc::new(builder.build().unwrap());
        let logger = pipeline.root_logger();

        group.bench_with_input(BenchmarkId::new("sinks", sink_count), &sink_count, |b, _| {
            b.iter(|| {
                let mut props = PropertyBag::new();
                props.set("UserId", CapturedValue::Int(7));
                logger.information("user {UserId} signed in", props);
            });
        });
    }

    group.finish();
}

fn bench_sampling_policies(c: &mut Criterion) {
    use lumen::sampling::{CounterPolicy, RatePolicy, SamplingPolicy};
    use chrono::Utc;
    use lumen::Event;

    let mut group = c.benchmark_group("sampling");
    let event = Event::new(Utc::now(), Level::Information, "tick", PropertyBag::new());

    let counter = CounterPolicy::new(10);
    group.bench_function("counter_every_10th", |b| {
        b.iter(|| counter.should_sample(&event));
    });

    let rate = RatePolicy::new(0.1);
    group.bench_function("rate_10_percent", |b| {
        b.iter(|| rate.should_sample(&event));
    });

    group.finish();
}

fn bench_capture(c: &mut Criterion) {
    use lumen::capture::Capturer;

    #[derive(Clone)]
    struct OrderLine {
        sku: String,
        quantity: u32,
        unit_price: f64,
    }

    impl lumen::capture::Capture for OrderLine {
        fn capture(&self) -> CapturedValue {
            CapturedValue::Struct {
                type_name: "OrderLine",
                fields: vec![
                    ("sku".to_string(), CapturedValue::Str(self.sku.clone())),
                    ("quantity".to_string(), CapturedValue::UInt(self.quantity as u64)),
                    ("unit_price".to_string(), CapturedValue::Float(self.unit_price)),
                ],
            }
        }
    }

    let capturer = Capturer::default();
    let lines: Vec<OrderLine> = (0..20)
        .map(|i| OrderLine {
            sku: format!("SKU-{i}"),
            quantity: i as u32 + 1,
            unit_price: 9.99,
        })
        .collect();

    let mut group = c.benchmark_group("capture");
    group.bench_function("destructure_20_element_list", |b| {
        b.iter(|| capturer.capture_destructured(&lines));
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = bench_template_parse_and_render, bench_pipeline_dispatch, bench_sampling_policies, bench_capture
}
criterion_main!(benches);
