use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cwreport_sdk::{
    MemoryTransport, MetricFilter, MetricRegistry, ReporterConfig, SnapshotTranslator, Transport,
};
use cwreport_types::{Batch, Snapshot};

/// Transport that drops every batch, so only translation is measured.
struct NullTransport;

impl Transport for NullTransport {
    fn deliver(&self, batch: &Batch) -> Result<(), cwreport_sdk::TransportError> {
        black_box(batch);
        Ok(())
    }
}

fn populated_registry(instances: usize) -> MetricRegistry {
    let registry = MetricRegistry::new();
    for i in 0..instances {
        registry.counter(&format!("counter-{}", i)).inc_by(i as u64);
        registry.meter(&format!("meter-{}", i)).mark_n(10);

        let histogram = registry.histogram(&format!("histogram-{}", i));
        let timer = registry.timer(&format!("timer-{}", i));
        for v in 0..100 {
            histogram.update(v);
            timer.update(Duration::from_micros(v as u64 * 37));
        }
    }
    registry
}

/// Benchmark translate() with varying instance counts per kind
fn bench_translate_varying_instances(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate_varying_instances");

    for instances in [1, 10, 50, 100].iter() {
        let snapshot = populated_registry(*instances).snapshot(&MetricFilter::all());
        let mut translator = SnapshotTranslator::new(ReporterConfig::new("bench")).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(instances), instances, |b, _| {
            b.iter(|| {
                black_box(translator.translate(&snapshot, &NullTransport).unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark translate() with every optional reading enabled
fn bench_translate_all_readings(c: &mut Criterion) {
    let snapshot = populated_registry(20).snapshot(&MetricFilter::all());

    let mut config = ReporterConfig::new("bench")
        .with_instance_id("i-0123456789")
        .with_percentiles([0.5, 0.75, 0.95, 0.98, 0.99, 0.999]);
    config.five_minute_rate = true;
    config.fifteen_minute_rate = true;
    config.meter_summary = true;
    config.timer_summary = true;
    config.histogram_summary = true;
    let mut translator = SnapshotTranslator::new(config).unwrap();

    c.bench_function("translate_all_readings", |b| {
        b.iter(|| {
            black_box(translator.translate(&snapshot, &NullTransport).unwrap());
        });
    });
}

/// Benchmark a full cycle: registry snapshot, translation, in-memory delivery
fn bench_full_cycle(c: &mut Criterion) {
    let registry = populated_registry(20);
    let mut translator = SnapshotTranslator::new(ReporterConfig::new("bench")).unwrap();
    let transport = MemoryTransport::new();

    c.bench_function("full_cycle", |b| {
        b.iter(|| {
            let snapshot: Snapshot = registry.snapshot(&MetricFilter::all());
            black_box(translator.translate(&snapshot, &transport).unwrap());
            transport.clear();
        });
    });
}

criterion_group!(
    benches,
    bench_translate_varying_instances,
    bench_translate_all_readings,
    bench_full_cycle,
);
criterion_main!(benches);
