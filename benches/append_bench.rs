//! Benchmarks for LogDB append and traversal

use std::hint::black_box;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logdb::Store;

fn append_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for size in [16usize, 256, 4096] {
        let payload = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes((size * 1_000) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                let store = Store::create(16, 64, Cursor::new(Vec::new())).unwrap();
                for ts in 0..1_000u64 {
                    store.append_bytes(ts, payload).unwrap();
                }
                black_box(store.end_offset())
            });
        });
    }

    group.finish();
}

fn traversal_benchmarks(c: &mut Criterion) {
    let store = Store::create(16, 64, Cursor::new(Vec::new())).unwrap();
    for ts in 0..10_000u64 {
        store.append_bytes(ts, format!("event {}", ts).as_bytes()).unwrap();
    }

    c.bench_function("records_10k", |b| {
        b.iter(|| black_box(store.records().unwrap().len()))
    });

    c.bench_function("audit_10k", |b| b.iter(|| black_box(store.audit().unwrap())));
}

criterion_group!(benches, append_benchmarks, traversal_benchmarks);
criterion_main!(benches);
