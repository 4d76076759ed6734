//! # ferroflate core
//!
//! Core primitives for the ferroflate DEFLATE/zlib codec.
//!
//! This crate provides the building blocks the codec layer is written
//! against:
//!
//! - [`bitstream`]: resumable bit-level input and pending bit/byte output
//! - [`checksum`]: Adler-32 and CRC-32 streaming checksums
//! - [`window`]: the 32 KiB decompression history window
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ferroflate is a layered stack; this crate is the bottom layer:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ L2: Codec (ferroflate crate)                         │
//! │     Deflater/Inflater state machines,                │
//! │     LZ77 engine, Huffman coding                      │
//! ├──────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate)                          │
//! │     BitInput/BitOutput, OutputWindow,                │
//! │     Adler-32/CRC-32                                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Container formats (ZIP, GZIP, TAR) are deliberately *not* part of the
//! stack; they consume the codec layer's byte-stream contract.
//!
//! ## Example
//!
//! ```rust
//! use ferroflate_core::bitstream::{BitInput, BitOutput};
//! use ferroflate_core::checksum::Crc32;
//!
//! let mut out = BitOutput::new();
//! out.write_bits(0b101, 3);
//! out.align_to_byte();
//! let mut buf = [0u8; 1];
//! out.flush(&mut buf);
//!
//! let mut input = BitInput::new();
//! input.set_input(&buf).unwrap();
//! assert_eq!(input.get_bits(3), Some(0b101));
//!
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod window;

// Re-exports for convenience
pub use bitstream::{BitInput, BitOutput};
pub use checksum::{Adler32, Crc32};
pub use error::{FlateError, Result};
pub use window::{OutputWindow, WINDOW_SIZE};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitInput, BitOutput};
    pub use crate::checksum::{Adler32, Crc32};
    pub use crate::error::{FlateError, Result};
    pub use crate::window::OutputWindow;
}
