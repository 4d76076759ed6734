//! Compression and decompression throughput benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ferroflate::{deflate, inflate};
use std::hint::black_box;

fn random_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 0x123456789ABCDEF0;
    for _ in 0..size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        data.push((seed >> 32) as u8);
    }
    data
}

fn text_data(size: usize) -> Vec<u8> {
    let sample = b"The quick brown fox jumps over the lazy dog. ";
    sample.iter().copied().cycle().take(size).collect()
}

fn repeated_data(size: usize) -> Vec<u8> {
    vec![0x41; size]
}

fn bench_deflate(c: &mut Criterion) {
    let mut group = c.benchmark_group("deflate");

    let cases = [
        ("random", random_data(256 * 1024)),
        ("text", text_data(256 * 1024)),
        ("repeated", repeated_data(256 * 1024)),
    ];

    for (name, data) in &cases {
        group.throughput(Throughput::Bytes(data.len() as u64));
        for level in [1u8, 6, 9] {
            group.bench_with_input(
                BenchmarkId::new(*name, format!("level{}", level)),
                data,
                |b, data| {
                    b.iter(|| deflate(black_box(data), level).unwrap());
                },
            );
        }
    }

    group.finish();
}

fn bench_inflate(c: &mut Criterion) {
    let mut group = c.benchmark_group("inflate");

    let cases = [
        ("random", random_data(256 * 1024)),
        ("text", text_data(256 * 1024)),
        ("repeated", repeated_data(256 * 1024)),
    ];

    for (name, data) in &cases {
        let compressed = deflate(data, 6).unwrap();
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new(*name, "level6"), &compressed, |b, input| {
            b.iter(|| inflate(black_box(input)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_deflate, bench_inflate);
criterion_main!(benches);
