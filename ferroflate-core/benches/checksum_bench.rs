//! Throughput benchmarks for the checksum implementations.
//!
//! Covers Adler-32 and CRC-32 across data sizes that exercise both the
//! sliced/batched fast paths and the byte-at-a-time tails, plus
//! incremental updates in odd-sized chunks.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ferroflate_core::checksum::{Adler32, Crc32};
use std::hint::black_box;

/// Reproducible pseudo-random test data.
fn random_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 0x123456789ABCDEF0;
    for _ in 0..size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        data.push((seed >> 32) as u8);
    }
    data
}

fn bench_crc32(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");

    for size in [64usize, 4096, 65536, 1 << 20] {
        let data = random_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("one_shot", size), &data, |b, data| {
            b.iter(|| Crc32::compute(black_box(data)));
        });
        group.bench_with_input(BenchmarkId::new("chunked_977", size), &data, |b, data| {
            b.iter(|| {
                let mut crc = Crc32::new();
                for chunk in data.chunks(977) {
                    crc.update(black_box(chunk));
                }
                crc.value()
            });
        });
    }

    group.finish();
}

fn bench_adler32(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32");

    for size in [64usize, 4096, 65536, 1 << 20] {
        let data = random_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("one_shot", size), &data, |b, data| {
            b.iter(|| Adler32::compute(black_box(data)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_crc32, bench_adler32);
criterion_main!(benches);
