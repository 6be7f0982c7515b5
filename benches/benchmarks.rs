use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use telem::{MetricPoint, MetricStore};

/// Deterministic pseudo-random point stream; no external RNG needed.
struct PointGen {
    state: u64,
}

impl PointGen {
    fn new(seed: u64) -> Self {
        PointGen { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_point(&mut self, series_cardinality: u64, now: i64) -> MetricPoint {
        let r = self.next_u64();
        MetricPoint {
            name: format!("series_{}", r % series_cardinality),
            value: (r >> 16) as f64 / 1e6,
            timestamp: now - (r % 120) as i64,
        }
    }
}

fn generate_points(seed: u64, n: usize, series_cardinality: u64, now: i64) -> Vec<MetricPoint> {
    let mut gen = PointGen::new(seed);
    (0..n)
        .map(|_| gen.next_point(series_cardinality, now))
        .collect()
}

fn populated_store(points: &[MetricPoint]) -> MetricStore {
    let store = MetricStore::default();
    for p in points {
        store.add(p.clone()).expect("add");
    }
    store
}

const NOW: i64 = 1_700_000_000;

fn bench_ingest(c: &mut Criterion) {
    let points = generate_points(0x5eed, 20_000, 64, NOW);

    let mut group = c.benchmark_group("ingest");
    group.bench_function("add_20k_64_series", |b| {
        b.iter_batched(
            MetricStore::default,
            |store| {
                for p in &points {
                    store.add(black_box(p.clone())).unwrap();
                }
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let points = generate_points(0x5eed, 120_000, 64, NOW);
    let store = populated_store(&points);

    let mut group = c.benchmark_group("query");
    group.bench_function("stats_120k_64_series", |b| {
        b.iter(|| black_box(store.stats().unwrap()))
    });
    group.bench_function("rate_120k_64_series", |b| {
        b.iter(|| black_box(store.rate(black_box(60), NOW).unwrap()))
    });
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    // Timestamps spread over the last 120s; a 60s TTL evicts about half.
    let points = generate_points(0x5eed, 100_000, 64, NOW);

    let mut group = c.benchmark_group("sweep");
    group.bench_function("sweep_100k_half_expired", |b| {
        b.iter_batched(
            || populated_store(&points),
            |store| black_box(store.sweep(NOW, 60).unwrap()),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_ingest, bench_queries, bench_sweep);
criterion_main!(benches);
