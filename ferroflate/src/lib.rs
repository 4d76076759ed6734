//! # ferroflate
//!
//! Pure Rust streaming implementation of the DEFLATE compressed data
//! format (RFC 1951) and the zlib wrapper (RFC 1950).
//!
//! ## Features
//!
//! - **Compression**: LZ77 hash-chain match finding with greedy and
//!   lazy strategies, levels 0-9, stored/static/dynamic block selection
//!   by estimated size, preset dictionaries, sync flush.
//! - **Decompression**: all three block types, preset dictionaries,
//!   Adler-32 trailer verification, and full resumability — both
//!   codecs accept input and emit output in arbitrary chunks.
//!
//! ## Example
//!
//! ```rust
//! use ferroflate::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! Streaming use goes through [`Deflater`] and [`Inflater`]: feed
//! chunks with `set_input`, drain with `deflate`/`inflate`, and consult
//! `needs_input`/`is_finished` to drive the loop.
//!
//! ## Compression levels
//!
//! - Level 0: no compression (stored blocks)
//! - Levels 1-3: fast, greedy matching
//! - Levels 4-6: lazy matching (default is 6)
//! - Levels 7-9: best compression, deepest match search

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod tables;
pub mod zlib;

// Re-exports
pub use deflate::{Deflater, deflate};
pub use huffman::{HuffmanCoder, HuffmanDecodeTree};
pub use inflate::{DynHeaderDecoder, Inflater, inflate};
pub use lz77::{DeflateStrategy, DeflaterEngine};
pub use zlib::{
    zlib_compress, zlib_compress_with_dict, zlib_decompress, zlib_decompress_with_dict,
};
