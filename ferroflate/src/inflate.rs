//! DEFLATE decompression (RFC 1951) with zlib framing (RFC 1950).
//!
//! [`Inflater`] is a resumable decode state machine. Input arrives in
//! arbitrary chunks through [`Inflater::set_input`]; every
//! [`Inflater::inflate`] call picks up exactly where bit starvation last
//! suspended decoding. A Huffman symbol is never partially consumed:
//! the bit reader's peek/drop contract guarantees that running out of
//! input mid-code leaves the stream position untouched.
//!
//! The state machine follows the stream structure: header → optional
//! dictionary wait → block loop {stored | static | dynamic} → Adler-32
//! trailer. Fall-through between states is expressed as explicit
//! transitions re-dispatched in a loop.

use crate::huffman::HuffmanDecodeTree;
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_BASE, DISTANCE_EXTRA_BITS, LENGTH_BASE, LENGTH_EXTRA_BITS,
    MAX_MATCH, fixed_distance_tree, fixed_litlen_tree,
};
use ferroflate_core::bitstream::BitInput;
use ferroflate_core::checksum::Adler32;
use ferroflate_core::error::{FlateError, Result};
use ferroflate_core::window::OutputWindow;

/// Decoder states, in stream order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Reading the 2-byte zlib header.
    Header,
    /// Waiting for the caller to supply the preset dictionary.
    Dictionary,
    /// Between blocks: reading the next 3-bit block header.
    Blocks,
    /// Stored block: reading LEN.
    StoredLen1,
    /// Stored block: reading NLEN.
    StoredLen2,
    /// Stored block: copying bytes.
    Stored,
    /// Reading a dynamic block's Huffman tables.
    DynHeader,
    /// Decoding literal/length symbols.
    Huffman,
    /// Reading a length code's extra bits.
    HuffmanLenBits,
    /// Decoding a distance symbol.
    HuffmanDist,
    /// Reading a distance code's extra bits.
    HuffmanDistBits,
    /// Reading the 4-byte Adler-32 trailer.
    Checksum,
    /// Stream complete.
    Finished,
}

/// Phases of the dynamic header parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderPhase {
    /// HLIT/HDIST/HCLEN counts.
    Counts,
    /// The 3-bit code lengths of the bit-length alphabet.
    MetaLengths,
    /// A literal/distance code length or an RLE opcode.
    Symbol,
    /// Extra bits of an RLE opcode (what to repeat, base count, width).
    Repeat { value: u8, base: u8, bits: u32 },
}

/// Resumable parser for a dynamic block's Huffman tables.
///
/// Holds an explicit phase plus all partial results so that
/// [`DynHeaderDecoder::attempt_read`] can return "need more bits" at any
/// point and be re-entered later without losing state.
#[derive(Debug)]
pub struct DynHeaderDecoder {
    phase: HeaderPhase,
    lit_count: usize,
    dist_count: usize,
    meta_count: usize,
    meta_lengths: [u8; 19],
    meta_index: usize,
    meta_tree: Option<HuffmanDecodeTree>,
    lengths: Vec<u8>,
    index: usize,
}

impl DynHeaderDecoder {
    /// Start parsing a dynamic header.
    pub fn new() -> Self {
        Self {
            phase: HeaderPhase::Counts,
            lit_count: 0,
            dist_count: 0,
            meta_count: 0,
            meta_lengths: [0; 19],
            meta_index: 0,
            meta_tree: None,
            lengths: Vec::new(),
            index: 0,
        }
    }

    /// Advance as far as the buffered bits allow.
    ///
    /// Returns `Ok(true)` once both tables are fully read, `Ok(false)`
    /// when more input is needed.
    pub fn attempt_read(&mut self, input: &mut BitInput) -> Result<bool> {
        loop {
            match self.phase {
                HeaderPhase::Counts => {
                    let Some(counts) = input.get_bits(14) else {
                        return Ok(false);
                    };
                    self.lit_count = (counts & 0x1f) as usize + 257;
                    self.dist_count = ((counts >> 5) & 0x1f) as usize + 1;
                    self.meta_count = ((counts >> 10) & 0x0f) as usize + 4;
                    if self.lit_count > 286 {
                        return Err(FlateError::corrupted(
                            input.bit_position(),
                            format!("too many literal/length codes: {}", self.lit_count),
                        ));
                    }
                    if self.dist_count > 30 {
                        return Err(FlateError::corrupted(
                            input.bit_position(),
                            format!("too many distance codes: {}", self.dist_count),
                        ));
                    }
                    self.lengths = vec![0; self.lit_count + self.dist_count];
                    self.phase = HeaderPhase::MetaLengths;
                }
                HeaderPhase::MetaLengths => {
                    while self.meta_index < self.meta_count {
                        let Some(len) = input.get_bits(3) else {
                            return Ok(false);
                        };
                        self.meta_lengths[CODE_LENGTH_ORDER[self.meta_index]] = len as u8;
                        self.meta_index += 1;
                    }
                    self.meta_tree = Some(HuffmanDecodeTree::new(&self.meta_lengths)?);
                    self.phase = HeaderPhase::Symbol;
                }
                HeaderPhase::Symbol => {
                    if self.index == self.lengths.len() {
                        return Ok(true);
                    }
                    let tree = self.meta_tree.as_ref().expect("meta tree built");
                    let Some(symbol) = tree.get_symbol(input)? else {
                        return Ok(false);
                    };
                    match symbol {
                        0..=15 => {
                            self.lengths[self.index] = symbol as u8;
                            self.index += 1;
                        }
                        16 => {
                            if self.index == 0 {
                                return Err(FlateError::corrupted(
                                    input.bit_position(),
                                    "repeat opcode with no previous code length",
                                ));
                            }
                            let prev = self.lengths[self.index - 1];
                            self.phase = HeaderPhase::Repeat {
                                value: prev,
                                base: 3,
                                bits: 2,
                            };
                        }
                        17 => {
                            self.phase = HeaderPhase::Repeat {
                                value: 0,
                                base: 3,
                                bits: 3,
                            };
                        }
                        18 => {
                            self.phase = HeaderPhase::Repeat {
                                value: 0,
                                base: 11,
                                bits: 7,
                            };
                        }
                        _ => {
                            return Err(FlateError::invalid_huffman(input.bit_position()));
                        }
                    }
                }
                HeaderPhase::Repeat { value, base, bits } => {
                    let Some(extra) = input.get_bits(bits) else {
                        return Ok(false);
                    };
                    let count = base as usize + extra as usize;
                    if self.index + count > self.lengths.len() {
                        return Err(FlateError::corrupted(
                            input.bit_position(),
                            "code length repeat overruns the declared tables",
                        ));
                    }
                    self.lengths[self.index..self.index + count].fill(value);
                    self.index += count;
                    self.phase = HeaderPhase::Symbol;
                }
            }
        }
    }

    /// Build the literal/length and distance decode trees.
    pub fn into_trees(self, bit_position: u64) -> Result<(HuffmanDecodeTree, HuffmanDecodeTree)> {
        debug_assert_eq!(self.index, self.lengths.len());
        if self.lengths[256] == 0 {
            return Err(FlateError::corrupted(
                bit_position,
                "end-of-block code has zero length",
            ));
        }
        let litlen = HuffmanDecodeTree::new(&self.lengths[..self.lit_count])?;
        let dist = HuffmanDecodeTree::new(&self.lengths[self.lit_count..])?;
        Ok((litlen, dist))
    }
}

impl Default for DynHeaderDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming DEFLATE decompressor.
///
/// # Example
///
/// ```
/// use ferroflate::{deflate, Inflater};
///
/// let compressed = deflate(b"data to squeeze", 6).unwrap();
/// let mut inflater = Inflater::new_raw();
/// let restored = inflater.decompress_to_vec(&compressed).unwrap();
/// assert_eq!(restored, b"data to squeeze");
/// ```
#[derive(Debug)]
pub struct Inflater {
    mode: Mode,
    no_header: bool,
    /// Big-endian accumulator for the dictionary id and trailer.
    read_adler: u32,
    /// Bits still owed by the current multi-read field.
    needed_bits: u32,
    /// Remaining byte count of the current stored block.
    stored_len: usize,
    /// Length of the back-reference being decoded.
    rep_length: usize,
    /// Distance of the back-reference being decoded.
    rep_dist: usize,
    is_last_block: bool,
    /// Dynamic trees; `None` selects the fixed RFC 1951 tables.
    litlen_tree: Option<HuffmanDecodeTree>,
    dist_tree: Option<HuffmanDecodeTree>,
    dyn_header: Option<DynHeaderDecoder>,
    input: BitInput,
    output_window: OutputWindow,
    adler: Adler32,
    total_in: u64,
    total_out: u64,
}

impl Inflater {
    /// Create a decompressor for a zlib-wrapped stream.
    pub fn new() -> Self {
        Self::with_options(false)
    }

    /// Create a decompressor for a raw DEFLATE stream (no zlib header
    /// or Adler-32 trailer).
    pub fn new_raw() -> Self {
        Self::with_options(true)
    }

    /// Create a decompressor with explicit framing behavior.
    pub fn with_options(no_header: bool) -> Self {
        Self {
            mode: if no_header { Mode::Blocks } else { Mode::Header },
            no_header,
            read_adler: 0,
            needed_bits: 0,
            stored_len: 0,
            rep_length: 0,
            rep_dist: 0,
            is_last_block: false,
            litlen_tree: None,
            dist_tree: None,
            dyn_header: None,
            input: BitInput::new(),
            output_window: OutputWindow::new(),
            adler: Adler32::new(),
            total_in: 0,
            total_out: 0,
        }
    }

    /// Reset to decode a fresh stream, reusing internal buffers.
    pub fn reset(&mut self) {
        self.mode = if self.no_header {
            Mode::Blocks
        } else {
            Mode::Header
        };
        self.read_adler = 0;
        self.needed_bits = 0;
        self.stored_len = 0;
        self.rep_length = 0;
        self.rep_dist = 0;
        self.is_last_block = false;
        self.litlen_tree = None;
        self.dist_tree = None;
        self.dyn_header = None;
        self.input.reset();
        self.output_window.reset();
        self.adler.reset();
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Supply the next chunk of compressed input.
    pub fn set_input(&mut self, input: &[u8]) -> Result<()> {
        self.input.set_input(input)?;
        self.total_in += input.len() as u64;
        Ok(())
    }

    /// Whether the decoder has consumed all supplied input.
    pub fn needs_input(&self) -> bool {
        self.input.needs_input()
    }

    /// Whether the stream declared a preset dictionary that the caller
    /// must now supply via [`Inflater::set_dictionary`].
    pub fn needs_dictionary(&self) -> bool {
        self.mode == Mode::Dictionary && self.needed_bits == 0
    }

    /// Whether the stream is fully decoded and drained.
    pub fn is_finished(&self) -> bool {
        self.mode == Mode::Finished && self.output_window.available() == 0
    }

    /// Adler-32 of the decompressed output so far.
    pub fn adler(&self) -> u32 {
        self.adler.value()
    }

    /// Total compressed bytes accepted.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total decompressed bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Supply the preset dictionary announced by the stream header.
    ///
    /// The dictionary's Adler-32 must match the id read from the
    /// stream; anything else means compressor and decompressor disagree
    /// about the dictionary bytes.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if !self.needs_dictionary() {
            return Err(FlateError::invalid_state(
                "no dictionary is needed at this point",
            ));
        }
        let computed = Adler32::compute(dictionary);
        if computed != self.read_adler {
            return Err(FlateError::checksum_mismatch(self.read_adler, computed));
        }
        self.output_window.copy_dict(dictionary);
        self.mode = Mode::Blocks;
        Ok(())
    }

    /// Decompress into `output`, returning the number of bytes written.
    ///
    /// Zero means more input is needed (or that the stream is finished,
    /// or a dictionary is required; check the respective queries).
    pub fn inflate(&mut self, output: &mut [u8]) -> Result<usize> {
        if output.is_empty() {
            // Nothing to drain; still advance the state machine so
            // trailer-only tails get verified.
            if !self.is_finished() {
                while self.decode()? {}
            }
            return Ok(0);
        }

        let mut copied = 0;
        loop {
            if self.mode != Mode::Checksum {
                let more = self.output_window.copy_output(&mut output[copied..]);
                if more > 0 {
                    self.adler.update(&output[copied..copied + more]);
                    copied += more;
                    self.total_out += more as u64;
                    if copied == output.len() {
                        return Ok(copied);
                    }
                }
            }

            let progressed = self.decode()?;
            if !progressed
                && (self.output_window.available() == 0 || self.mode == Mode::Checksum)
            {
                break;
            }
        }
        Ok(copied)
    }

    /// Advance the state machine one step. Returns whether progress was
    /// made; `false` means input starvation, a dictionary wait, or
    /// completion.
    fn decode(&mut self) -> Result<bool> {
        loop {
            return match self.mode {
                Mode::Header => self.decode_header(),
                Mode::Dictionary => self.decode_dict(),
                Mode::Checksum => self.decode_checksum(),
                Mode::Finished => Ok(false),
                Mode::Blocks => {
                    if self.is_last_block {
                        if self.no_header {
                            self.mode = Mode::Finished;
                            return Ok(false);
                        }
                        self.input.skip_to_byte_boundary();
                        self.needed_bits = 32;
                        self.mode = Mode::Checksum;
                        continue;
                    }

                    let Some(header) = self.input.get_bits(3) else {
                        return Ok(false);
                    };
                    if header & 1 != 0 {
                        self.is_last_block = true;
                    }
                    match header >> 1 {
                        0 => {
                            self.input.skip_to_byte_boundary();
                            self.mode = Mode::StoredLen1;
                        }
                        1 => {
                            self.litlen_tree = None;
                            self.dist_tree = None;
                            self.mode = Mode::Huffman;
                        }
                        2 => {
                            self.dyn_header = Some(DynHeaderDecoder::new());
                            self.mode = Mode::DynHeader;
                        }
                        _ => {
                            return Err(FlateError::corrupted(
                                self.input.bit_position(),
                                "reserved block type 3",
                            ));
                        }
                    }
                    continue;
                }
                Mode::StoredLen1 => {
                    let Some(len) = self.input.get_bits(16) else {
                        return Ok(false);
                    };
                    self.stored_len = len as usize;
                    self.mode = Mode::StoredLen2;
                    continue;
                }
                Mode::StoredLen2 => {
                    let Some(nlen) = self.input.get_bits(16) else {
                        return Ok(false);
                    };
                    if nlen as usize != (self.stored_len ^ 0xffff) {
                        return Err(FlateError::corrupted(
                            self.input.bit_position(),
                            "broken uncompressed block",
                        ));
                    }
                    self.mode = Mode::Stored;
                    continue;
                }
                Mode::Stored => {
                    let copied = self
                        .output_window
                        .copy_stored(&mut self.input, self.stored_len)?;
                    self.stored_len -= copied;
                    if self.stored_len == 0 {
                        self.mode = Mode::Blocks;
                        Ok(true)
                    } else {
                        Ok(!self.input.needs_input())
                    }
                }
                Mode::DynHeader => {
                    let header = self.dyn_header.as_mut().expect("dyn header active");
                    if !header.attempt_read(&mut self.input)? {
                        return Ok(false);
                    }
                    let header = self.dyn_header.take().expect("dyn header active");
                    let (litlen, dist) = header.into_trees(self.input.bit_position())?;
                    self.litlen_tree = Some(litlen);
                    self.dist_tree = Some(dist);
                    self.mode = Mode::Huffman;
                    continue;
                }
                Mode::Huffman
                | Mode::HuffmanLenBits
                | Mode::HuffmanDist
                | Mode::HuffmanDistBits => self.decode_huffman(),
            };
        }
    }

    fn decode_header(&mut self) -> Result<bool> {
        let Some(header) = self.input.get_bits(16) else {
            return Ok(false);
        };
        // Bits arrive LSB-first, so the two header bytes come out swapped.
        let header = ((header << 8) | (header >> 8)) & 0xffff;
        if header % 31 != 0 {
            return Err(FlateError::invalid_header("header checksum illegal"));
        }
        if header & 0x0f00 != 8 << 8 {
            return Err(FlateError::invalid_header("compression method unknown"));
        }
        if header & 0x0020 == 0 {
            self.mode = Mode::Blocks;
        } else {
            self.mode = Mode::Dictionary;
            self.needed_bits = 32;
        }
        Ok(true)
    }

    fn decode_dict(&mut self) -> Result<bool> {
        while self.needed_bits > 0 {
            let Some(byte) = self.input.get_bits(8) else {
                return Ok(false);
            };
            self.read_adler = (self.read_adler << 8) | byte;
            self.needed_bits -= 8;
        }
        // Parked until set_dictionary() provides the bytes.
        Ok(false)
    }

    fn decode_checksum(&mut self) -> Result<bool> {
        while self.needed_bits > 0 {
            let Some(byte) = self.input.get_bits(8) else {
                return Ok(false);
            };
            self.read_adler = (self.read_adler << 8) | byte;
            self.needed_bits -= 8;
        }
        let computed = self.adler.value();
        if computed != self.read_adler {
            return Err(FlateError::checksum_mismatch(self.read_adler, computed));
        }
        self.mode = Mode::Finished;
        Ok(false)
    }

    /// Decode Huffman-coded symbols until the window fills, input runs
    /// dry, or the block ends. Sub-states carve the length/distance
    /// decode into resumable steps so starvation can strike between any
    /// two fields.
    fn decode_huffman(&mut self) -> Result<bool> {
        let mut free = self.output_window.free_space();
        while free >= MAX_MATCH {
            match self.mode {
                Mode::Huffman => {
                    let symbol = loop {
                        let symbol = {
                            let tree = match &self.litlen_tree {
                                Some(tree) => tree,
                                None => fixed_litlen_tree(),
                            };
                            tree.get_symbol(&mut self.input)?
                        };
                        match symbol {
                            None => return Ok(false),
                            Some(lit) if lit < 256 => {
                                self.output_window.write(lit as u8)?;
                                free -= 1;
                                if free < MAX_MATCH {
                                    return Ok(true);
                                }
                            }
                            Some(symbol) => break symbol,
                        }
                    };

                    if symbol == 256 {
                        // End of block.
                        self.litlen_tree = None;
                        self.dist_tree = None;
                        self.mode = Mode::Blocks;
                        return Ok(true);
                    }

                    let idx = (symbol - 257) as usize;
                    if idx >= LENGTH_BASE.len() {
                        return Err(FlateError::corrupted(
                            self.input.bit_position(),
                            format!("invalid literal/length code {}", symbol),
                        ));
                    }
                    self.rep_length = LENGTH_BASE[idx] as usize;
                    self.needed_bits = u32::from(LENGTH_EXTRA_BITS[idx]);
                    self.mode = Mode::HuffmanLenBits;
                }
                Mode::HuffmanLenBits => {
                    if self.needed_bits > 0 {
                        let Some(extra) = self.input.get_bits(self.needed_bits) else {
                            return Ok(false);
                        };
                        self.rep_length += extra as usize;
                    }
                    self.mode = Mode::HuffmanDist;
                }
                Mode::HuffmanDist => {
                    let symbol = {
                        let tree = match &self.dist_tree {
                            Some(tree) => tree,
                            None => fixed_distance_tree(),
                        };
                        tree.get_symbol(&mut self.input)?
                    };
                    let Some(symbol) = symbol else {
                        return Ok(false);
                    };
                    let idx = symbol as usize;
                    if idx >= DISTANCE_BASE.len() {
                        return Err(FlateError::corrupted(
                            self.input.bit_position(),
                            format!("invalid distance code {}", symbol),
                        ));
                    }
                    self.rep_dist = DISTANCE_BASE[idx] as usize;
                    self.needed_bits = u32::from(DISTANCE_EXTRA_BITS[idx]);
                    self.mode = Mode::HuffmanDistBits;
                }
                Mode::HuffmanDistBits => {
                    if self.needed_bits > 0 {
                        let Some(extra) = self.input.get_bits(self.needed_bits) else {
                            return Ok(false);
                        };
                        self.rep_dist += extra as usize;
                    }
                    self.output_window.repeat(self.rep_length, self.rep_dist)?;
                    free -= self.rep_length;
                    self.mode = Mode::Huffman;
                }
                _ => unreachable!("decode_huffman entered in mode {:?}", self.mode),
            }
        }
        Ok(true)
    }

    /// Decompress `data` in one call, draining everything into a vector.
    ///
    /// Fails on truncated input; for streams requiring a preset
    /// dictionary, use the streaming API with
    /// [`Inflater::set_dictionary`].
    pub fn decompress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.set_input(data)?;

        let mut out = Vec::new();
        let mut buf = [0u8; 16384];
        loop {
            let n = self.inflate(&mut buf)?;
            out.extend_from_slice(&buf[..n]);
            if self.is_finished() {
                break;
            }
            if n == 0 {
                if self.needs_dictionary() {
                    return Err(FlateError::invalid_state(
                        "stream requires a preset dictionary",
                    ));
                }
                return Err(FlateError::corrupted(
                    self.input.bit_position(),
                    "truncated stream",
                ));
            }
        }
        Ok(out)
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

/// Decompress a raw DEFLATE stream (no zlib framing).
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new_raw().decompress_to_vec(data)
}
