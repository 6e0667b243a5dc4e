//! Hot path benchmarks for the recording side of the engine.
//!
//! Run with: `cargo bench --bench record_path`
//! Compare baselines: `cargo bench --bench record_path -- --baseline main`
//!
//! Every instrumented event pays for key encoding, one sketch update and
//! one top-k check under the tracker lock, so those dominate.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use metric_topk::{CountMinSketch, MetricKeyEncoder, TagSet, TopK, TopKTracker};

fn tag_set(n: usize) -> TagSet {
    (0..n)
        .map(|i| (format!("tag{}", i), format!("value{}", i)))
        .collect()
}

/// Benchmark MetricKeyEncoder::encode across tag counts
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    for tags in [0, 3, 8] {
        let tag_set = tag_set(tags);
        group.bench_with_input(BenchmarkId::new("tags", tags), &tag_set, |b, t| {
            b.iter(|| MetricKeyEncoder::encode(black_box("http.requests"), black_box(t)))
        });
    }

    group.finish();
}

/// Benchmark CountMinSketch::increment at different accuracy settings
fn bench_sketch_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("sketch_increment");
    group.throughput(Throughput::Elements(1));

    for (epsilon, delta) in [(0.01, 0.1), (0.001, 0.01), (0.0001, 0.001)] {
        let label = format!("eps_{}_delta_{}", epsilon, delta);
        group.bench_function(label, |b| {
            let mut sketch = CountMinSketch::new(epsilon, delta).unwrap();
            let mut i = 0u64;
            b.iter(|| {
                i = i.wrapping_add(1);
                sketch.increment(black_box(&(i % 1024)))
            })
        });
    }

    group.finish();
}

/// Benchmark TopK::record with a skewed key distribution
fn bench_topk_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("topk_record");
    group.throughput(Throughput::Elements(1));

    let keys: Vec<String> = (0..4096).map(|i| format!("metric.{}:host=web{}", i % 64, i)).collect();

    for k in [10, 100] {
        group.bench_function(format!("k_{}", k), |b| {
            let mut topk = TopK::with_error_bounds(k, 0.001, 0.01).unwrap();
            let mut i = 0usize;
            b.iter(|| {
                // Every other event hits the first 16 keys
                i = i.wrapping_add(1);
                let idx = if i % 2 == 0 { i % 16 } else { i % keys.len() };
                topk.record(black_box(&keys[idx]))
            })
        });
    }

    group.finish();
}

/// Benchmark the locked tracker (uncontended)
fn bench_tracker_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_record");
    group.throughput(Throughput::Elements(1));

    let tracker = TopKTracker::with_error_bounds(10, 0.001, 0.01).unwrap();
    let tags = tag_set(3);
    group.bench_function("encode_and_record", |b| {
        b.iter(|| {
            let key = MetricKeyEncoder::encode(black_box("http.requests"), &tags);
            tracker.record(&key)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_sketch_increment,
    bench_topk_record,
    bench_tracker_record
);
criterion_main!(benches);
