//! DEFLATE compression (RFC 1951) with the zlib wrapper (RFC 1950).
//!
//! [`Deflater`] is the top-level compressor state machine. It owns the
//! LZ77 engine and drives the header → body → trailer sequence: the
//! 2-byte zlib header is written lazily on the first [`Deflater::deflate`]
//! call (unless raw mode is selected), compressed blocks follow, and
//! after [`Deflater::finish`] the stream is closed with a big-endian
//! Adler-32 trailer.
//!
//! The caller feeds input with [`Deflater::set_input`] and drains output
//! with [`Deflater::deflate`] in a loop; a return of zero bytes means
//! either more input is needed or the stream is finished.

use crate::lz77::{DeflateStrategy, DeflaterEngine};
use ferroflate_core::error::{FlateError, Result};

// State flags and composed states, in stream order.
const IS_SETDICT: u32 = 0x01;
const IS_FLUSHING: u32 = 0x04;
const IS_FINISHING: u32 = 0x08;

const INIT_STATE: u32 = 0x00;
const BUSY_STATE: u32 = 0x10;
const FLUSHING_STATE: u32 = BUSY_STATE | IS_FLUSHING;
const FINISHING_STATE: u32 = BUSY_STATE | IS_FLUSHING | IS_FINISHING;
const FINISHED_STATE: u32 = FINISHING_STATE | 0x02;

/// Compression method field of the zlib header (DEFLATE).
const DEFLATED: u32 = 8;
/// log2(window size) - 8, the CINFO field for a 32 KiB window.
const WINDOW_BITS_CODE: u32 = 7;
/// FDICT flag in the zlib header.
const PRESET_DICT: u32 = 0x20;

/// Streaming DEFLATE compressor.
///
/// # Example
///
/// ```
/// use ferroflate::{Deflater, Inflater};
///
/// let mut deflater = Deflater::new(6);
/// deflater.set_input(b"Hello, World! Hello, World!").unwrap();
/// deflater.finish();
///
/// let mut compressed = Vec::new();
/// let mut buf = [0u8; 1024];
/// while !deflater.is_finished() {
///     let n = deflater.deflate(&mut buf).unwrap();
///     compressed.extend_from_slice(&buf[..n]);
/// }
///
/// let mut inflater = Inflater::new();
/// let decompressed = inflater.decompress_to_vec(&compressed).unwrap();
/// assert_eq!(decompressed, b"Hello, World! Hello, World!");
/// ```
#[derive(Debug)]
pub struct Deflater {
    level: u8,
    no_header: bool,
    state: u32,
    total_out: u64,
    engine: DeflaterEngine,
}

impl Deflater {
    /// Create a compressor producing a zlib-wrapped stream at the given
    /// level (0-9; values above 9 are clamped).
    pub fn new(level: u8) -> Self {
        Self::with_options(level, false)
    }

    /// Create a compressor producing a raw DEFLATE stream without the
    /// zlib header and Adler-32 trailer (for embedding in containers
    /// that carry their own framing, e.g. gzip or zip).
    pub fn new_raw(level: u8) -> Self {
        Self::with_options(level, true)
    }

    /// Create a compressor with explicit header behavior.
    pub fn with_options(level: u8, no_header: bool) -> Self {
        let level = level.min(9);
        Self {
            level,
            no_header,
            state: INIT_STATE,
            total_out: 0,
            engine: DeflaterEngine::new(level),
        }
    }

    /// Reset to compress a fresh stream, reusing internal buffers.
    pub fn reset(&mut self) {
        self.state = INIT_STATE;
        self.total_out = 0;
        self.engine.reset();
    }

    /// Adler-32 checksum of the input consumed so far.
    pub fn adler(&self) -> u32 {
        self.engine.adler()
    }

    /// Total bytes of input consumed.
    pub fn total_in(&self) -> u64 {
        self.engine.total_in()
    }

    /// Total bytes of compressed output produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Change the compression level; affects blocks from the next one on.
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(9);
        self.engine.set_level(self.level);
    }

    /// Set the match-emission strategy.
    pub fn set_strategy(&mut self, strategy: DeflateStrategy) {
        self.engine.set_strategy(strategy);
    }

    /// Preload a preset dictionary.
    ///
    /// Only valid on a fresh stream, before any input or output. The
    /// dictionary's Adler-32 is echoed in the zlib header so the
    /// decompressor can verify it was given the same bytes.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.state != INIT_STATE {
            return Err(FlateError::invalid_state(
                "dictionary must be set before compression starts",
            ));
        }
        self.state = IS_SETDICT;
        self.engine.set_dictionary(dictionary);
        Ok(())
    }

    /// Supply the next chunk of input.
    ///
    /// Fails after [`Deflater::finish`], or while previous input is
    /// still unconsumed (check [`Deflater::needs_input`]).
    pub fn set_input(&mut self, input: &[u8]) -> Result<()> {
        if self.state & IS_FINISHING != 0 {
            return Err(FlateError::invalid_state(
                "finish() was already called",
            ));
        }
        self.engine.set_input(input)
    }

    /// Whether all supplied input has been consumed.
    pub fn needs_input(&self) -> bool {
        self.engine.needs_input()
    }

    /// Request that all pending input be compressed and the output
    /// padded to a byte boundary, so everything produced so far can be
    /// decoded without waiting for more.
    pub fn flush(&mut self) {
        self.state |= IS_FLUSHING;
    }

    /// Mark the end of the stream. One-way: no further input is
    /// accepted. Keep calling [`Deflater::deflate`] until
    /// [`Deflater::is_finished`] reports true.
    pub fn finish(&mut self) {
        self.state |= IS_FLUSHING | IS_FINISHING;
    }

    /// Whether the stream is complete and fully drained.
    pub fn is_finished(&self) -> bool {
        self.state == FINISHED_STATE && self.engine.pending_is_flushed()
    }

    /// Compress into `output`, returning the number of bytes written.
    ///
    /// Zero means "need more input" (or, after [`Deflater::finish`],
    /// that the stream is complete).
    pub fn deflate(&mut self, output: &mut [u8]) -> Result<usize> {
        let total = output.len();

        if self.state < BUSY_STATE {
            self.write_header();
            self.state = BUSY_STATE | (self.state & (IS_FLUSHING | IS_FINISHING));
        }

        let mut offset = 0;
        loop {
            let count = self.engine.pending().flush(&mut output[offset..]);
            offset += count;
            self.total_out += count as u64;

            if offset == total || self.state == FINISHED_STATE {
                break;
            }

            let flushing = self.state & IS_FLUSHING != 0;
            let finishing = self.state & IS_FINISHING != 0;
            if !self.engine.deflate(flushing, finishing) {
                match self.state {
                    BUSY_STATE => return Ok(offset),
                    FLUSHING_STATE => {
                        if self.level > 0 {
                            // Pad to a byte boundary with empty static
                            // blocks (3-bit header + 7-bit end-of-block),
                            // leaving the decoder byte-aligned.
                            let pending = self.engine.pending();
                            let mut needed = 8 + (pending.bit_count().wrapping_neg() & 7);
                            while needed > 0 {
                                pending.write_bits(2, 10);
                                needed = needed.saturating_sub(10);
                            }
                        }
                        self.state = BUSY_STATE;
                    }
                    FINISHING_STATE => {
                        let pending = self.engine.pending();
                        pending.align_to_byte();
                        if !self.no_header {
                            let adler = self.engine.adler();
                            let pending = self.engine.pending();
                            pending.write_short_msb((adler >> 16) as u16);
                            pending.write_short_msb(adler as u16);
                        }
                        self.state = FINISHED_STATE;
                    }
                    _ => {}
                }
            }
        }

        Ok(offset)
    }

    /// Write the 2-byte zlib header (and 4-byte dictionary id if a
    /// preset dictionary was installed).
    fn write_header(&mut self) {
        if self.no_header {
            return;
        }

        let mut header = (DEFLATED | (WINDOW_BITS_CODE << 4)) << 8;
        let level_flags: u32 = match self.level {
            0..=2 => 0,
            3..=5 => 1,
            6 => 2,
            _ => 3,
        };
        header |= level_flags << 6;
        if self.state & IS_SETDICT != 0 {
            header |= PRESET_DICT;
        }
        // FCHECK makes the 16-bit header a multiple of 31.
        header += 31 - header % 31;

        let set_dict = self.state & IS_SETDICT != 0;
        let dict_adler = self.engine.adler();
        let pending = self.engine.pending();
        pending.write_short_msb(header as u16);
        if set_dict {
            pending.write_short_msb((dict_adler >> 16) as u16);
            pending.write_short_msb(dict_adler as u16);
            self.engine.reset_adler();
        }
    }

    /// Compress `data` in one call, draining everything into a vector.
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.set_input(data)?;
        self.finish();

        let mut out = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = self.deflate(&mut buf)?;
            out.extend_from_slice(&buf[..n]);
            if self.is_finished() {
                break;
            }
            if n == 0 {
                return Err(FlateError::invalid_state(
                    "compressor stalled before finishing",
                ));
            }
        }
        Ok(out)
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(6)
    }
}

/// Compress `data` as a raw DEFLATE stream (no zlib framing).
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    Deflater::new_raw(level).compress_to_vec(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::inflate;

    #[test]
    fn test_deflate_stored() {
        let input = b"Hello, World!";
        let compressed = deflate(input, 0).unwrap();
        // Stored framing adds five bytes.
        assert_eq!(compressed.len(), input.len() + 5);
        assert_eq!(inflate(&compressed).unwrap(), input);
    }

    #[test]
    fn test_deflate_compressed() {
        let input = b"AAAAAAAAAABBBBBBBBBBCCCCCCCCCC";
        let compressed = deflate(input, 6).unwrap();
        assert!(
            compressed.len() < input.len(),
            "compressed {} bytes to {} bytes",
            input.len(),
            compressed.len()
        );
        assert_eq!(inflate(&compressed).unwrap(), input);
    }

    #[test]
    fn test_deflate_empty() {
        for level in [0, 1, 6, 9] {
            let compressed = deflate(b"", level).unwrap();
            assert!(inflate(&compressed).unwrap().is_empty(), "level {}", level);
        }
    }

    #[test]
    fn test_deflate_roundtrip_levels() {
        let inputs: Vec<Vec<u8>> = vec![
            b"Hello".to_vec(),
            b"The quick brown fox jumps over the lazy dog".to_vec(),
            vec![0u8; 1000],
            (0..=255).collect(),
            (0..40_000u32).map(|i| (i % 7) as u8).collect(),
        ];

        for input in &inputs {
            for level in [0, 1, 3, 6, 9] {
                let compressed = deflate(input, level).unwrap();
                let decompressed = inflate(&compressed).unwrap();
                assert_eq!(
                    &decompressed,
                    input,
                    "roundtrip failed at level {} for {} bytes",
                    level,
                    input.len()
                );
            }
        }
    }

    #[test]
    fn test_set_input_after_finish_fails() {
        let mut deflater = Deflater::new(6);
        deflater.set_input(b"data").unwrap();
        deflater.finish();
        assert!(deflater.set_input(b"more").is_err());
    }

    #[test]
    fn test_set_dictionary_after_start_fails() {
        let mut deflater = Deflater::new(6);
        deflater.set_input(b"data").unwrap();
        let mut buf = [0u8; 64];
        deflater.deflate(&mut buf).unwrap();
        assert!(deflater.set_dictionary(b"dict").is_err());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let input: Vec<u8> = (0..10_000u32).map(|i| (i * 13 % 256) as u8).collect();

        let mut deflater = Deflater::new(7);
        let first = deflater.compress_to_vec(&input).unwrap();
        deflater.reset();
        let second = deflater.compress_to_vec(&input).unwrap();
        assert_eq!(first, second);

        let fresh = Deflater::new(7).compress_to_vec(&input).unwrap();
        assert_eq!(first, fresh);
    }

    #[test]
    fn test_zlib_header_fields() {
        let mut deflater = Deflater::new(6);
        let compressed = deflater.compress_to_vec(b"test").unwrap();

        // CMF: CM=8, CINFO=7.
        assert_eq!(compressed[0], 0x78);
        // Header must be a multiple of 31.
        let header = u16::from_be_bytes([compressed[0], compressed[1]]);
        assert_eq!(header % 31, 0);
        // No preset dictionary.
        assert_eq!(compressed[1] & 0x20, 0);
    }

    #[test]
    fn test_trailer_is_adler32() {
        use ferroflate_core::checksum::Adler32;

        let input = b"payload with a checksum";
        let mut deflater = Deflater::new(6);
        let compressed = deflater.compress_to_vec(input).unwrap();

        let trailer = u32::from_be_bytes(
            compressed[compressed.len() - 4..].try_into().unwrap(),
        );
        assert_eq!(trailer, Adler32::compute(input));
    }

    #[test]
    fn test_streaming_output_chunks() {
        let input: Vec<u8> = (0..30_000u32).map(|i| (i % 251) as u8).collect();

        let mut deflater = Deflater::new_raw(6);
        deflater.set_input(&input).unwrap();
        deflater.finish();

        // Drain through a tiny buffer to exercise resumable output.
        let mut compressed = Vec::new();
        let mut buf = [0u8; 7];
        while !deflater.is_finished() {
            let n = deflater.deflate(&mut buf).unwrap();
            compressed.extend_from_slice(&buf[..n]);
        }

        let one_shot = deflate(&input, 6).unwrap();
        assert_eq!(compressed, one_shot);
        assert_eq!(inflate(&compressed).unwrap(), input);
    }

    #[test]
    fn test_streaming_input_chunks() {
        let input: Vec<u8> = (0..50_000u32).map(|i| (i * 31 % 253) as u8).collect();

        let mut deflater = Deflater::new_raw(6);
        let mut compressed = Vec::new();
        let mut buf = [0u8; 4096];

        for chunk in input.chunks(777) {
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

        assert_eq!(inflate(&compressed).unwrap(), input);
    }

    #[test]
    fn test_sync_flush_mid_stream() {
        let mut deflater = Deflater::new_raw(6);
        let mut compressed = Vec::new();
        let mut buf = [0u8; 4096];

        deflater.set_input(b"first half ").unwrap();
        deflater.flush();
        loop {
            let n = deflater.deflate(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            compressed.extend_from_slice(&buf[..n]);
        }
        let flushed_at = compressed.len();

        deflater.set_input(b"second half").unwrap();
        deflater.finish();
        while !deflater.is_finished() {
            let n = deflater.deflate(&mut buf).unwrap();
            compressed.extend_from_slice(&buf[..n]);
        }

        assert!(flushed_at > 0);
        assert_eq!(inflate(&compressed).unwrap(), b"first half second half");
    }

    #[test]
    fn test_huffman_only_strategy() {
        let input = vec![b'z'; 4000];
        let mut deflater = Deflater::new_raw(6);
        deflater.set_strategy(DeflateStrategy::HuffmanOnly);
        let compressed = deflater.compress_to_vec(&input).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), input);
    }
}
