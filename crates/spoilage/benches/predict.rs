//! Inference benchmarks: single-reading latency and batch throughput.

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use spoilage::testing::{synthetic_batch, synthetic_dataset, train_small_bundle};
use spoilage::{FeatureVector, InferencePipeline};

fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(5))
        .sample_size(20)
}

fn pipeline() -> InferencePipeline {
    let bundle = train_small_bundle(&synthetic_dataset(1_000, 42)).expect("training failed");
    InferencePipeline::new(Arc::new(bundle))
}

fn bench_predict_one(c: &mut Criterion) {
    let pipeline = pipeline();
    let reading = FeatureVector::new(50.0, 7.0, 20.0, 50.0, 9.0);

    c.bench_function("predict/one", |b| {
        b.iter(|| black_box(pipeline.predict_one(black_box(&reading))))
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let pipeline = pipeline();
    let mut group = c.benchmark_group("predict/batch_size");

    for batch_size in [10usize, 100, 1_000, 10_000] {
        let table = synthetic_batch(batch_size, 7)
            .and_then(|raw| raw.feature_table())
            .expect("synthetic batch");

        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &table, |b, table| {
            b.iter(|| black_box(pipeline.predict_batch(black_box(table))))
        });
    }

    group.finish();
}

fn bench_annotate(c: &mut Criterion) {
    let pipeline = pipeline();
    let raw = synthetic_batch(1_000, 9).expect("synthetic batch");

    let mut group = c.benchmark_group("predict/annotate");
    group.throughput(Throughput::Elements(raw.n_rows() as u64));
    group.bench_function("1000", |b| b.iter(|| black_box(pipeline.annotate(black_box(&raw)))));
    group.finish();
}

criterion_group! {
    name = benches;
    config = default_criterion();
    targets = bench_predict_one, bench_predict_batch, bench_annotate
}
criterion_main!(benches);
