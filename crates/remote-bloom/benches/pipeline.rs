//! # Remote Bloom Pipeline Benchmarks
//!
//! Measures the client side of the protocol against the in-process store:
//! - Hashing: MurmurHash64A bit index derivation per item
//! - Single add / check: one full issue + drain round
//! - Batched add: issue N items, drain once

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use std::time::Duration;

use remote_bloom::domain::{FilterLayout, StoreOptions};
use remote_bloom::{FilterConfig, FilterContext, MemoryBackend, MemoryStore};

fn open(backend: &MemoryBackend, capacity: u64) -> FilterContext<MemoryStore> {
    let config = FilterConfig::new("bench", capacity, 0.01).expect("valid config");
    FilterContext::open(config, backend.connect(), &StoreOptions::default()).expect("open")
}

fn random_items(count: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let mut item = vec![0u8; 32];
            rng.fill(item.as_mut_slice());
            item
        })
        .collect()
}

fn bench_probe_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("remote-bloom-probes");
    let layout = FilterLayout::new(FilterConfig::new("bench", 1_000_000, 0.001).expect("valid"));
    let item = [0xAB_u8; 32];

    group.bench_function("probes_32_byte_item", |b| {
        b.iter(|| black_box(layout.probes(black_box(&item)).count()))
    });
    group.finish();
}

fn bench_single_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("remote-bloom-single");
    group.measurement_time(Duration::from_secs(5));

    let backend = MemoryBackend::new();
    let mut filter = open(&backend, 100_000);
    let items = random_items(1024);
    let mut i = 0;

    group.bench_function("add", |b| {
        b.iter(|| {
            i = (i + 1) % items.len();
            black_box(filter.add(&items[i]).expect("add"))
        })
    });

    group.bench_function("contains", |b| {
        b.iter(|| {
            i = (i + 1) % items.len();
            black_box(filter.contains(&items[i]).expect("contains"))
        })
    });
    group.finish();
}

fn bench_batched_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("remote-bloom-batched");

    for size in [10usize, 100, 1000] {
        let backend = MemoryBackend::new();
        let mut filter = open(&backend, 100_000);
        let items = random_items(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("extend", size), &items, |b, items| {
            b.iter(|| black_box(filter.extend(items.iter()).expect("extend")))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_probe_derivation,
    bench_single_operations,
    bench_batched_add
);
criterion_main!(benches);
