//! Performance benchmarks for sim_channel using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sim_channel::config::ConfigTree;
use sim_channel::delivery::csma_ca::bucket::LeakyBucket;
use sim_channel::delivery::{CsmaCa, DeliveryModel};
use sim_channel::test_helpers::StubPositions;
use std::time::Duration;

fn bench_bucket_admission(c: &mut Criterion) {
    // Drain rarely so the benchmark measures the admission path, not timing.
    let bucket = LeakyBucket::new(i64::MAX / 2, Duration::from_secs(3600), 1);
    bucket.start();
    c.bench_function("bucket_admission", |b| {
        b.iter(|| black_box(bucket.fill(black_box(150_000))));
    });
    bucket.stop();
}

fn csma_model(nodes: usize) -> CsmaCa {
    let mut model = CsmaCa::with_seed(42);
    model
        .configure(
            &ConfigTree::new()
                .with_leaf("/bench/transmission_range", "100")
                .with_leaf("/bench/interference_range", "250")
                .with_leaf("/bench/mac_protocol", "802.11g")
                .with_leaf("/bench/max_ucast_attempts", "4")
                .with_leaf("/bench/data_rate_mbps", "54"),
        )
        .expect("valid bench config");
    model.initialize(StubPositions::line(nodes, 10.0).into_positions());
    model
}

fn bench_unicast(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_unicast");
    for nodes in [2usize, 10, 50] {
        let model = csma_model(nodes);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &nodes, |b, _| {
            b.iter(|| black_box(model.send_unicast(0, 1, 1000)));
        });
    }
    group.finish();
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_broadcast");
    for nodes in [10usize, 50] {
        let model = csma_model(nodes);
        let mut buffer = vec![0usize; nodes];
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &nodes, |b, _| {
            b.iter(|| black_box(model.send_broadcast(0, 1000, &mut buffer).len()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bucket_admission, bench_unicast, bench_broadcast);
criterion_main!(benches);
