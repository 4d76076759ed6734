//! End-to-end round-trip tests for the DEFLATE codec.

use ferroflate::zlib::{zlib_compress, zlib_decompress};
use ferroflate::{Deflater, Inflater, deflate, inflate};
use ferroflate_core::checksum::Adler32;
use proptest::prelude::*;

fn text_like(size: usize) -> Vec<u8> {
    let sample = b"The quick brown fox jumps over the lazy dog. Pack my box with five dozen liquor jugs. ";
    sample.iter().copied().cycle().take(size).collect()
}

fn pseudo_random(size: usize, mut seed: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    for _ in 0..size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        data.push((seed >> 33) as u8);
    }
    data
}

#[test]
fn roundtrip_all_levels_all_shapes() {
    let shapes: Vec<(&str, Vec<u8>)> = vec![
        ("empty", Vec::new()),
        ("single", vec![0x41]),
        ("four", vec![0, 1, 2, 3]),
        ("zeros", vec![0u8; 4096]),
        ("text", text_like(20_000)),
        ("random", pseudo_random(20_000, 42)),
        ("alternating", (0..10_000).map(|i| (i % 2) as u8 * 255).collect()),
    ];

    for (name, data) in &shapes {
        for level in 0..=9 {
            let compressed = deflate(data, level).unwrap();
            let decompressed = inflate(&compressed).unwrap();
            assert_eq!(&decompressed, data, "{} at level {}", name, level);
        }
    }
}

#[test]
fn roundtrip_over_one_megabyte() {
    let mut data = text_like(700_000);
    data.extend_from_slice(&pseudo_random(500_000, 7));

    for level in [1, 6, 9] {
        let compressed = deflate(&data, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed.len(), data.len(), "level {}", level);
        assert_eq!(decompressed, data, "level {}", level);
    }
}

#[test]
fn hundred_thousand_a_bytes_at_level_6() {
    // 100,000 repetitions of 0x41 must reduce to a handful of
    // maximum-length matches.
    let data = vec![0x41u8; 100_000];

    let compressed = zlib_compress(&data, 6).unwrap();
    assert!(
        compressed.len() < 200,
        "expected < 200 bytes, got {}",
        compressed.len()
    );

    let decompressed = zlib_decompress(&compressed).unwrap();
    assert_eq!(decompressed, data);

    // And the trailer carries the right checksum.
    let trailer = u32::from_be_bytes(compressed[compressed.len() - 4..].try_into().unwrap());
    assert_eq!(trailer, Adler32::compute(&data));
}

#[test]
fn four_distinct_bytes_finish_cleanly() {
    let data = [0u8, 1, 2, 3];

    let mut deflater = Deflater::new(6);
    let compressed = deflater.compress_to_vec(&data).unwrap();
    assert!(deflater.is_finished());

    let mut inflater = Inflater::new();
    let decompressed = inflater.decompress_to_vec(&compressed).unwrap();
    assert_eq!(decompressed, data);
    assert!(inflater.is_finished());
}

#[test]
fn level_zero_is_stored_only() {
    let data = text_like(200_000);
    let compressed = deflate(&data, 0).unwrap();

    // Stored framing only ever adds five bytes per emitted block.
    assert!(compressed.len() <= data.len() + 100);

    // Every block header must declare BTYPE=00. Walk the stored-block
    // chain byte-aligned.
    let mut pos = 0;
    loop {
        let header = compressed[pos];
        assert_eq!(header >> 1 & 0b11, 0, "block at {} not stored", pos);
        let len = u16::from_le_bytes([compressed[pos + 1], compressed[pos + 2]]) as usize;
        let nlen = u16::from_le_bytes([compressed[pos + 3], compressed[pos + 4]]) as usize;
        assert_eq!(len ^ 0xffff, nlen);
        pos += 5 + len;
        if header & 1 != 0 {
            break;
        }
    }
    assert_eq!(pos, compressed.len());

    assert_eq!(inflate(&compressed).unwrap(), data);
}

#[test]
fn maximum_match_length_and_distance() {
    // A 258-byte pattern repeated at a large distance: forces matches at
    // the length cap, and a reference nearly a full window back.
    let pattern: Vec<u8> = (0..258u32).map(|i| (i * 17 % 251) as u8).collect();
    let mut data = pattern.clone();
    data.extend(std::iter::repeat_n(0x99u8, 32_000));
    data.extend_from_slice(&pattern);

    for level in [6, 9] {
        let compressed = deflate(&data, level).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), data, "level {}", level);
    }
}

#[test]
fn window_slide_preserves_matches() {
    // Larger than one window so the slide rebasing runs; repeats ensure
    // matches span the slide boundary.
    let unit = text_like(1000);
    let mut data = Vec::new();
    for _ in 0..80 {
        data.extend_from_slice(&unit);
    }
    assert!(data.len() > 2 * 32_768);

    for level in [1, 6, 9] {
        let compressed = deflate(&data, level).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), data, "level {}", level);
    }
}

#[test]
fn input_exactly_one_window() {
    let data = pseudo_random(32_768, 99);
    for level in [0, 1, 6, 9] {
        let compressed = deflate(&data, level).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), data, "level {}", level);
    }
}

#[test]
fn reset_reproduces_byte_identical_output() {
    let data = text_like(50_000);

    let mut deflater = Deflater::new(6);
    let first = deflater.compress_to_vec(&data).unwrap();
    deflater.reset();
    let second = deflater.compress_to_vec(&data).unwrap();
    assert_eq!(first, second);

    let mut inflater = Inflater::new_raw();
    let out1 = inflater.decompress_to_vec(&first).unwrap();
    inflater.reset();
    let out2 = inflater.decompress_to_vec(&second).unwrap();
    assert_eq!(out1, out2);
    assert_eq!(out1, data);
}

#[test]
fn streaming_matches_one_shot() {
    let data = text_like(150_000);
    let one_shot = deflate(&data, 6).unwrap();

    // Feed input in ragged chunks and drain through a small buffer.
    let mut deflater = Deflater::new_raw(6);
    let mut compressed = Vec::new();
    let mut buf = [0u8; 997];
    for chunk in data.chunks(1237) {
        deflater.set_input(chunk).unwrap();
        while !deflater.needs_input() {
            let n = deflater.deflate(&mut buf).unwrap();
            compressed.extend_from_slice(&buf[..n]);
        }
    }
    deflater.finish();
    while !deflater.is_finished() {
        let n = deflater.deflate(&mut buf).unwrap();
        compressed.extend_from_slice(&buf[..n]);
    }

    assert_eq!(compressed, one_shot);

    // Decode the stream byte by byte.
    let mut inflater = Inflater::new_raw();
    let mut restored = Vec::new();
    let mut out = [0u8; 313];
    for &byte in &compressed {
        inflater.set_input(&[byte]).unwrap();
        loop {
            let n = inflater.inflate(&mut out).unwrap();
            restored.extend_from_slice(&out[..n]);
            if n == 0 {
                break;
            }
        }
    }
    assert!(inflater.is_finished());
    assert_eq!(restored, data);
}

#[test]
fn zlib_streams_interoperate_across_levels() {
    let data = text_like(30_000);
    for level in 0..=9 {
        let compressed = zlib_compress(&data, level).unwrap();
        let decompressed = zlib_decompress(&compressed).unwrap();
        assert_eq!(decompressed, data, "level {}", level);
    }
}

#[test]
fn adler_matches_on_both_sides() {
    let data = pseudo_random(77_777, 3);

    let mut deflater = Deflater::new(6);
    let compressed = deflater.compress_to_vec(&data).unwrap();

    let mut inflater = Inflater::new();
    let decompressed = inflater.decompress_to_vec(&compressed).unwrap();

    assert_eq!(decompressed, data);
    assert_eq!(deflater.adler(), inflater.adler());
    assert_eq!(deflater.adler(), Adler32::compute(&data));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..4096), level in 0u8..=9) {
        let compressed = deflate(&data, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        prop_assert_eq!(decompressed, data);
    }

    #[test]
    fn prop_roundtrip_repetitive(byte in any::<u8>(), run in 1usize..20_000, level in 1u8..=9) {
        let data = vec![byte; run];
        let compressed = deflate(&data, level).unwrap();
        let decompressed = inflate(&compressed).unwrap();
        prop_assert_eq!(decompressed, data);
    }

    #[test]
    fn prop_zlib_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let compressed = zlib_compress(&data, 6).unwrap();
        let decompressed = zlib_decompress(&compressed).unwrap();
        prop_assert_eq!(decompressed, data);
    }

    #[test]
    fn prop_garbage_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        // Arbitrary bytes must decode or error, never panic or loop.
        let _ = inflate(&data);
        let _ = zlib_decompress(&data);
    }
}
