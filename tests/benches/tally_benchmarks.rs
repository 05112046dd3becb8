//! # Tally Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | Single increment (uncontended) | < 1µs |
//! | Snapshot of 10k options | < 5ms |
//! | Flush cycle of 1k options (in-memory store) | < 10ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pc_01_vote_counter::{FlushConfig, FlushControl, InMemoryPollStore, Metrics, Tally, FlushDriver};
use rand::Rng;
use shared_types::VoteOption;
use std::sync::Arc;

fn options(n: usize) -> Vec<VoteOption> {
    (0..n)
        .map(|i| VoteOption::from(format!("option_{}", i)))
        .collect()
}

fn bench_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("tally-increment");
    let tally = Tally::new();
    let opts = options(64);
    let mut rng = rand::thread_rng();

    group.throughput(Throughput::Elements(1));
    group.bench_function("increment_random_option", |b| {
        b.iter(|| {
            let option = &opts[rng.gen_range(0..opts.len())];
            tally.increment(black_box(option), 1);
        })
    });
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("tally-snapshot");
    for size in [100, 1_000, 10_000] {
        let tally = Tally::new();
        for option in options(size) {
            tally.increment(&option, 3);
        }
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("snapshot", size), &size, |b, _| {
            b.iter(|| black_box(tally.snapshot()))
        });
    }
    group.finish();
}

fn bench_flush_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("flush-cycle");

    for size in [10, 100, 1_000] {
        let opts = options(size);
        let tally = Arc::new(Tally::new());
        let driver = FlushDriver::new(
            Arc::clone(&tally),
            Arc::new(InMemoryPollStore::new()),
            FlushConfig::default(),
            Arc::new(Metrics::new()),
        );

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("flush_now", size), &size, |b, _| {
            b.iter(|| {
                for option in &opts {
                    tally.increment(option, 1);
                }
                rt.block_on(driver.flush_now())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_increment, bench_snapshot, bench_flush_cycle);
criterion_main!(benches);
