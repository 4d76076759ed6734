//! One-shot zlib (RFC 1950) convenience functions.
//!
//! The zlib format wraps a raw DEFLATE stream with a 2-byte header and
//! a big-endian Adler-32 trailer:
//!
//! ```text
//! +---+---+=====================+---+---+---+---+
//! |CMF|FLG| DEFLATE bit stream  |    ADLER32    |
//! +---+---+=====================+---+---+---+---+
//! ```
//!
//! [`Deflater`] and [`Inflater`] produce and consume this framing
//! natively; the functions here just drive them for whole-buffer use.

use crate::deflate::Deflater;
use crate::inflate::Inflater;
use ferroflate_core::error::{FlateError, Result};

/// Compress `input` into a zlib stream at the given level (0-9).
///
/// # Example
///
/// ```
/// use ferroflate::zlib::{zlib_compress, zlib_decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = zlib_compress(data, 6).unwrap();
/// let decompressed = zlib_decompress(&compressed).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    Deflater::new(level).compress_to_vec(input)
}

/// Compress `input` into a zlib stream using a preset dictionary.
///
/// The dictionary's Adler-32 is recorded in the header (FDICT set), so
/// decompression requires the same dictionary via
/// [`zlib_decompress_with_dict`].
pub fn zlib_compress_with_dict(input: &[u8], level: u8, dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(level);
    deflater.set_dictionary(dictionary)?;
    deflater.compress_to_vec(input)
}

/// Decompress a zlib stream, verifying the Adler-32 trailer.
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().decompress_to_vec(input)
}

/// Decompress a zlib stream that may require a preset dictionary.
pub fn zlib_decompress_with_dict(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::new();
    inflater.set_input(input)?;

    let mut out = Vec::new();
    let mut buf = [0u8; 16384];
    loop {
        let n = inflater.inflate(&mut buf)?;
        out.extend_from_slice(&buf[..n]);
        if inflater.is_finished() {
            break;
        }
        if n == 0 {
            if inflater.needs_dictionary() {
                inflater.set_dictionary(dictionary)?;
                continue;
            }
            return Err(FlateError::corrupted(
                inflater.total_in() * 8,
                "truncated stream",
            ));
        }
    }
    Ok(out)
}

/// Report whether a zlib stream requires a preset dictionary, and if
/// so, the Adler-32 of the expected dictionary.
pub fn zlib_requires_dictionary(input: &[u8]) -> Option<u32> {
    if input.len() < 6 {
        return None;
    }
    let fdict = (input[1] >> 5) & 1;
    if fdict != 0 {
        Some(u32::from_be_bytes([input[2], input[3], input[4], input[5]]))
    } else {
        None
    }
}
