//! Constant tables mandated by RFC 1951.
//!
//! The length and distance alphabets, their extra-bit widths, the
//! transmission order of the code-length alphabet, and the fixed Huffman
//! code lengths are all wire-format constants: both the encoder and the
//! decoder must agree with every other DEFLATE implementation on these
//! values exactly.

use crate::huffman::HuffmanDecodeTree;
use std::sync::OnceLock;

/// Minimum back-reference length.
pub const MIN_MATCH: usize = 3;

/// Maximum back-reference length.
pub const MAX_MATCH: usize = 258;

/// Size of the literal/length alphabet (0-255 literals, 256 end-of-block,
/// 257-285 lengths; 286 and 287 never occur in a valid stream).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet.
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// Size of the code-length alphabet used to compress dynamic headers.
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End-of-block symbol in the literal/length alphabet.
pub const END_OF_BLOCK: usize = 256;

/// Base length values for length codes 257-285 (RFC 1951 section 3.2.5).
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits
];

/// Extra-bit widths for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Base distance values for distance codes 0-29 (RFC 1951 section 3.2.5).
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, // 0-3: 0 extra bits
    5, 7, // 4-5: 1 extra bit
    9, 13, // 6-7: 2 extra bits
    17, 25, // 8-9: 3 extra bits
    33, 49, // 10-11: 4 extra bits
    65, 97, // 12-13: 5 extra bits
    129, 193, // 14-15: 6 extra bits
    257, 385, // 16-17: 7 extra bits
    513, 769, // 18-19: 8 extra bits
    1025, 1537, // 20-21: 9 extra bits
    2049, 3073, // 22-23: 10 extra bits
    4097, 6145, // 24-25: 11 extra bits
    8193, 12289, // 26-27: 12 extra bits
    16385, 24577, // 28-29: 13 extra bits
];

/// Extra-bit widths for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, // 0-3
    1, 1, // 4-5
    2, 2, // 6-7
    3, 3, // 8-9
    4, 4, // 10-11
    5, 5, // 12-13
    6, 6, // 14-15
    7, 7, // 16-17
    8, 8, // 18-19
    9, 9, // 20-21
    10, 10, // 22-23
    11, 11, // 24-25
    12, 12, // 26-27
    13, 13, // 28-29
];

/// Transmission order of code-length code lengths in a dynamic block
/// header (RFC 1951 section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Fixed literal/length code lengths (RFC 1951 section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    for len in lengths.iter_mut().take(256).skip(144) {
        *len = 9;
    }
    for len in lengths.iter_mut().take(280).skip(256) {
        *len = 7;
    }
    lengths
}

/// Fixed distance code lengths: all 32 codes use 5 bits. Codes 30 and 31
/// participate in the code space but decode to an error.
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}

/// The fixed literal/length decode tree, built once.
pub fn fixed_litlen_tree() -> &'static HuffmanDecodeTree {
    static TREE: OnceLock<HuffmanDecodeTree> = OnceLock::new();
    TREE.get_or_init(|| {
        HuffmanDecodeTree::new(&fixed_litlen_lengths())
            .expect("fixed literal/length tree construction cannot fail")
    })
}

/// The fixed distance decode tree, built once.
pub fn fixed_distance_tree() -> &'static HuffmanDecodeTree {
    static TREE: OnceLock<HuffmanDecodeTree> = OnceLock::new();
    TREE.get_or_init(|| {
        HuffmanDecodeTree::new(&fixed_distance_lengths())
            .expect("fixed distance tree construction cannot fail")
    })
}

/// Map a match length (3-258) to its (code, extra bit width, extra value).
pub fn length_to_code(length: u16) -> (u16, u8, u16) {
    debug_assert!(
        (3..=258).contains(&length),
        "length out of range: {}",
        length
    );

    let length = length as usize;
    let code = match length {
        3..=10 => length - 3 + 257,
        11..=18 => (length - 11) / 2 + 265,
        19..=34 => (length - 19) / 4 + 269,
        35..=66 => (length - 35) / 8 + 273,
        67..=130 => (length - 67) / 16 + 277,
        131..=257 => (length - 131) / 32 + 281,
        _ => 285,
    };

    let base = LENGTH_BASE[code - 257] as usize;
    let extra_bits = LENGTH_EXTRA_BITS[code - 257];
    (code as u16, extra_bits, (length - base) as u16)
}

/// Map a distance (1-32768) to its (code, extra bit width, extra value).
pub fn distance_to_code(distance: u16) -> (u16, u8, u16) {
    debug_assert!(
        (1..=32768).contains(&distance),
        "distance out of range: {}",
        distance
    );

    let code: usize = match distance {
        1 => 0,
        2 => 1,
        3 => 2,
        4 => 3,
        5..=6 => 4,
        7..=8 => 5,
        9..=12 => 6,
        13..=16 => 7,
        17..=24 => 8,
        25..=32 => 9,
        33..=48 => 10,
        49..=64 => 11,
        65..=96 => 12,
        97..=128 => 13,
        129..=192 => 14,
        193..=256 => 15,
        257..=384 => 16,
        385..=512 => 17,
        513..=768 => 18,
        769..=1024 => 19,
        1025..=1536 => 20,
        1537..=2048 => 21,
        2049..=3072 => 22,
        3073..=4096 => 23,
        4097..=6144 => 24,
        6145..=8192 => 25,
        8193..=12288 => 26,
        12289..=16384 => 27,
        16385..=24576 => 28,
        _ => 29, // 24577..=32768
    };

    let base = DISTANCE_BASE[code];
    let extra_bits = DISTANCE_EXTRA_BITS[code];
    (code as u16, extra_bits, distance - base)
}

/// Reconstruct a match length from a length code and its extra bits.
pub fn decode_length(code: u16, extra: u16) -> u16 {
    debug_assert!((257..=285).contains(&code), "invalid length code: {}", code);
    LENGTH_BASE[(code - 257) as usize] + extra
}

/// Reconstruct a distance from a distance code and its extra bits.
pub fn decode_distance(code: u16, extra: u16) -> u16 {
    debug_assert!(code < 30, "invalid distance code: {}", code);
    DISTANCE_BASE[code as usize] + extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_litlen_lengths() {
        let lengths = fixed_litlen_lengths();
        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[143], 8);
        assert_eq!(lengths[144], 9);
        assert_eq!(lengths[255], 9);
        assert_eq!(lengths[256], 7);
        assert_eq!(lengths[279], 7);
        assert_eq!(lengths[280], 8);
        assert_eq!(lengths[287], 8);
    }

    #[test]
    fn test_fixed_trees_build() {
        let _ = fixed_litlen_tree();
        let _ = fixed_distance_tree();
    }

    #[test]
    fn test_length_code_roundtrip() {
        for length in 3..=258u16 {
            let (code, _, extra) = length_to_code(length);
            assert_eq!(decode_length(code, extra), length, "length {}", length);
        }
    }

    #[test]
    fn test_distance_code_roundtrip() {
        for distance in 1..=32768u32 {
            let distance = distance as u16;
            let (code, extra_bits, extra) = distance_to_code(distance);
            assert!(code < 30);
            assert!(u32::from(extra) < (1u32 << extra_bits));
            assert_eq!(decode_distance(code, extra), distance, "distance {}", distance);
        }
    }

    #[test]
    fn test_specific_lengths() {
        assert_eq!(length_to_code(3), (257, 0, 0));
        assert_eq!(length_to_code(10), (264, 0, 0));
        assert_eq!(length_to_code(11), (265, 1, 0));
        assert_eq!(length_to_code(12), (265, 1, 1));
        assert_eq!(length_to_code(257), (284, 5, 30));
        assert_eq!(length_to_code(258), (285, 0, 0));
    }

    #[test]
    fn test_specific_distances() {
        assert_eq!(distance_to_code(1), (0, 0, 0));
        assert_eq!(distance_to_code(4), (3, 0, 0));
        assert_eq!(distance_to_code(5), (4, 1, 0));
        assert_eq!(distance_to_code(6), (4, 1, 1));
        assert_eq!(distance_to_code(7), (5, 1, 0));
        assert_eq!(distance_to_code(24577), (29, 13, 0));
        assert_eq!(distance_to_code(32768), (29, 13, 8191));
    }
}
