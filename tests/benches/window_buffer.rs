//! # Window Buffer Benchmarks
//!
//! Throughput of the join hot path:
//!
//! | Operation | Shape |
//! |-----------|-------|
//! | insert | ordered and jittered event times, many keys |
//! | range probe | one key, window over a dense buffer |
//! | join | alternating sides, steady-state expiry |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::Event;
use sj_04_windowed_join::{JoinConfig, WindowBuffer, WindowedJoin};

const RETENTION_MS: i64 = 1_200_000;

fn events(count: usize, keys: usize, jitter_ms: i64) -> Vec<Event<u64>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|i| {
            let key = format!("customer-{}", rng.gen_range(0..keys));
            let time = (i as i64) * 100 + rng.gen_range(-jitter_ms..=jitter_ms);
            Event::new(key, i as u64, time, i as u64)
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("sj-04-buffer-insert");

    for jitter in [0i64, 60_000] {
        let batch = events(10_000, 100, jitter);
        group.throughput(Throughput::Elements(batch.len() as u64));
        group.bench_with_input(BenchmarkId::new("jitter_ms", jitter), &batch, |b, batch| {
            b.iter(|| {
                let mut buffer = WindowBuffer::new(RETENTION_MS);
                for event in batch.iter().cloned() {
                    let _ = buffer.insert(event);
                }
                black_box(buffer.len())
            })
        });
    }

    group.finish();
}

fn bench_range_probe(c: &mut Criterion) {
    let mut group = c.benchmark_group("sj-04-buffer-probe");

    for size in [100usize, 1_000, 10_000] {
        let mut buffer = WindowBuffer::new(i64::MAX / 4);
        for i in 0..size {
            let _ = buffer.insert(Event::new("c1", i as u64, (i as i64) * 1_000, i as u64));
        }
        let mid = (size as i64) * 500;

        group.bench_with_input(BenchmarkId::new("entries", size), &buffer, |b, buffer| {
            b.iter(|| black_box(buffer.range_query("c1", mid - 60_000, mid + 60_000).count()))
        });
    }

    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("sj-04-join");
    let batch = events(10_000, 50, 30_000);
    group.throughput(Throughput::Elements(batch.len() as u64));

    group.bench_function("alternating_sides", |b| {
        b.iter(|| {
            let combine = |l: &Event<u64>, r: &Event<u64>| l.payload ^ r.payload;
            let mut join = WindowedJoin::new(JoinConfig::new(60_000), combine).expect("valid config");
            let mut emitted = 0usize;
            for (i, event) in batch.iter().cloned().enumerate() {
                let outcome = if i % 2 == 0 {
                    join.on_left(event)
                } else {
                    join.on_right(event)
                };
                emitted += outcome.emitted.len();
            }
            black_box(emitted)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_range_probe, bench_join);
criterion_main!(benches);
