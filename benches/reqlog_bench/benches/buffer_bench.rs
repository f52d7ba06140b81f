//! Buffer benchmarks
//!
//! Measures the producer-side cost of submitting records, with and without
//! overflow, and batch draining.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reqlog_core::{Record, RecordBuffer, RecordBuilder};

fn record() -> Record {
    RecordBuilder::new("GET", "/users/42")
        .status(200)
        .correlation_id("bench")
        .duration_ms(1.5)
        .build()
}

fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue");
    let template = record();

    group.bench_function("with_room", |b| {
        let buffer = RecordBuffer::new(1_000_000);
        b.iter(|| buffer.enqueue(black_box(template.clone())))
    });

    group.bench_function("overflowing", |b| {
        let buffer = RecordBuffer::new(128);
        for _ in 0..128 {
            buffer.enqueue(template.clone());
        }
        b.iter(|| buffer.enqueue(black_box(template.clone())))
    });

    group.finish();
}

fn bench_dequeue(c: &mut Criterion) {
    let mut group = c.benchmark_group("dequeue_batch");
    let template = record();

    for batch in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            let buffer = RecordBuffer::new(batch);
            b.iter(|| {
                for _ in 0..batch {
                    buffer.enqueue(template.clone());
                }
                black_box(buffer.dequeue_batch(batch))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_enqueue, bench_dequeue);
criterion_main!(benches);
