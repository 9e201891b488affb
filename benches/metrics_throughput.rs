//! Metric batch throughput
//!
//! Measures `calculate_all_metrics` over random inputs of increasing size,
//! with and without the result cache, plus single metrics for comparison.
//!
//! ```bash
//! cargo bench --bench metrics_throughput
//! cargo bench --bench metrics_throughput --features parallel
//! ```

use bitscope::config::AnalysisConfig;
use bitscope::metrics::MetricsEngine;
use bitscope::BitString;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_bits(len: usize) -> BitString {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    BitString::from_bits((0..len).map(|_| rng.gen::<bool>()))
}

fn uncached_engine() -> MetricsEngine {
    let mut config = AnalysisConfig::default();
    config.metrics.cache = false;
    MetricsEngine::from_config(&config).unwrap()
}

/// Full batch without caching
fn bench_all_metrics(c: &mut Criterion) {
    let engine = uncached_engine();
    let mut group = c.benchmark_group("all_metrics");
    group.sample_size(20);

    for len in [1_024usize, 16_384, 131_072] {
        let bits = random_bits(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &bits, |b, bits| {
            b.iter(|| black_box(engine.calculate_all_metrics(black_box(bits))));
        });
    }

    group.finish();
}

/// Repeated batch on the same content, served from the cache
fn bench_all_metrics_cached(c: &mut Criterion) {
    let engine = MetricsEngine::from_config(&AnalysisConfig::default()).unwrap();
    let bits = random_bits(16_384);
    engine.calculate_all_metrics(&bits);

    c.bench_function("all_metrics_cached_16k", |b| {
        b.iter(|| black_box(engine.calculate_all_metrics(black_box(&bits))));
    });
}

fn bench_single_metrics(c: &mut Criterion) {
    let engine = uncached_engine();
    let bits = random_bits(65_536);
    let mut group = c.benchmark_group("single_metric_64k");

    for id in ["entropy", "longest_run", "lz_complexity", "longest_repeat_length"] {
        group.bench_function(id, |b| {
            b.iter(|| black_box(engine.calculate_metric(id, black_box(&bits))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_all_metrics,
    bench_all_metrics_cached,
    bench_single_metrics
);
criterion_main!(benches);
