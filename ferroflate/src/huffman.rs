//! Huffman coding for DEFLATE.
//!
//! DEFLATE uses canonical Huffman codes: a code assignment is fully
//! determined by the sorted list of code lengths, so only lengths travel
//! in the stream. Codes are assigned in increasing (length, symbol)
//! order and bit-reversed before emission, because DEFLATE defines codes
//! MSB-first but packs bytes LSB-first.
//!
//! Two halves live here:
//!
//! - [`HuffmanDecodeTree`]: a two-level flat lookup table for the
//!   decoder. Codes of up to 9 bits resolve with a single 512-entry
//!   lookup; longer codes follow a sub-table pointer. Symbol lookup is
//!   starvation-aware: it never consumes a partial code.
//! - [`HuffmanCoder`]: the encoder's per-block symbol buffer and its
//!   three frequency-counted trees (literal/length, distance,
//!   bit-length), including optimal tree construction with the
//!   deterministic length-limit overflow correction, and block emission
//!   choosing between stored, static, and dynamic encodings.

use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_ALPHABET_SIZE, END_OF_BLOCK, MIN_MATCH, distance_to_code,
    fixed_litlen_lengths, length_to_code,
};
use ferroflate_core::bitstream::{BitInput, BitOutput};
use ferroflate_core::error::{FlateError, Result};
use std::sync::OnceLock;

/// Maximum code length for literal/length and distance codes.
pub const MAX_BITLEN: usize = 15;

/// Maximum code length for the bit-length (header) code.
const MAX_BL_BITLEN: usize = 7;

/// Root table width of the decode tree: codes up to this many bits
/// resolve in one lookup.
const ROOT_BITS: usize = 9;
const ROOT_SIZE: usize = 1 << ROOT_BITS;

/// Per-block symbol buffer capacity.
const BUFFER_SIZE: usize = 1 << 14;

/// Code-length alphabet symbols for run-length encoding.
const REP_3_6: usize = 16;
const REP_3_10: usize = 17;
const REP_11_138: usize = 18;

/// Reverse the low `count` bits of `value`.
pub(crate) fn reverse_bits(mut value: u32, count: u32) -> u32 {
    let mut reversed = 0;
    for _ in 0..count {
        reversed = (reversed << 1) | (value & 1);
        value >>= 1;
    }
    reversed
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A canonical Huffman decode table built from code lengths.
///
/// The table is a flat array of packed entries. The low nibble of an
/// entry is the code's bit length. A non-negative entry holds
/// `symbol << 4`; a negative entry in the root table holds a sub-table
/// base pointer for codes longer than [`ROOT_BITS`] bits, with the low
/// nibble giving the widest code length in that sub-table.
#[derive(Debug, Clone)]
pub struct HuffmanDecodeTree {
    tree: Vec<i32>,
}

impl HuffmanDecodeTree {
    /// Build a decode tree from per-symbol code lengths (0 = unused).
    ///
    /// Fails if any length exceeds 15 bits or the lengths over-subscribe
    /// the code space. Incomplete codes are accepted; their unassigned
    /// entries produce an error if the stream ever selects them.
    pub fn new(code_lengths: &[u8]) -> Result<Self> {
        let mut bl_count = [0u32; MAX_BITLEN + 1];
        let mut max_len = 0usize;
        for &len in code_lengths {
            let len = len as usize;
            if len > 0 {
                if len > MAX_BITLEN {
                    return Err(FlateError::invalid_header(format!(
                        "code length {} exceeds maximum {}",
                        len, MAX_BITLEN
                    )));
                }
                bl_count[len] += 1;
                max_len = max_len.max(len);
            }
        }

        if max_len == 0 {
            // No symbols at all; every lookup is a format error.
            return Ok(Self {
                tree: vec![0; ROOT_SIZE],
            });
        }

        // First canonical code of each length, right-aligned.
        let mut next_code = [0u32; MAX_BITLEN + 1];
        let mut code = 0u32;
        let mut kraft = 0u64;
        for bits in 1..=max_len {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
            kraft += u64::from(bl_count[bits]) << (max_len - bits);
        }
        if kraft > 1u64 << max_len {
            return Err(FlateError::invalid_header(
                "over-subscribed Huffman code lengths",
            ));
        }

        // Group codes longer than the root width by their reversed 9-bit
        // prefix; each group gets one sub-table sized for its longest code.
        let mut group_bits = [0u8; ROOT_SIZE];
        {
            let mut nc = next_code;
            for &len in code_lengths {
                let len = len as usize;
                if len == 0 {
                    continue;
                }
                let code = nc[len];
                nc[len] += 1;
                if len > ROOT_BITS {
                    let rev = reverse_bits(code, len as u32) as usize;
                    let prefix = rev & (ROOT_SIZE - 1);
                    group_bits[prefix] = group_bits[prefix].max(len as u8);
                }
            }
        }

        let mut group_base = [0usize; ROOT_SIZE];
        let mut size = ROOT_SIZE;
        for prefix in 0..ROOT_SIZE {
            if group_bits[prefix] > 0 {
                group_base[prefix] = size;
                size += 1 << (group_bits[prefix] as usize - ROOT_BITS);
            }
        }

        let mut tree = vec![0i32; size];
        for prefix in 0..ROOT_SIZE {
            if group_bits[prefix] > 0 {
                tree[prefix] =
                    (-((group_base[prefix] as i32) << 4)) | i32::from(group_bits[prefix]);
            }
        }

        // Fill in the symbols.
        let mut nc = next_code;
        for (symbol, &len) in code_lengths.iter().enumerate() {
            let len = len as usize;
            if len == 0 {
                continue;
            }
            let code = nc[len];
            nc[len] += 1;
            let rev = reverse_bits(code, len as u32) as usize;
            let entry = ((symbol as i32) << 4) | len as i32;

            if len <= ROOT_BITS {
                let mut idx = rev;
                while idx < ROOT_SIZE {
                    tree[idx] = entry;
                    idx += 1 << len;
                }
            } else {
                let prefix = rev & (ROOT_SIZE - 1);
                let base = group_base[prefix];
                let sub_size = 1usize << (group_bits[prefix] as usize - ROOT_BITS);
                let mut idx = rev >> ROOT_BITS;
                while idx < sub_size {
                    tree[base + idx] = entry;
                    idx += 1 << (len - ROOT_BITS);
                }
            }
        }

        Ok(Self { tree })
    }

    /// Decode one symbol from `input`.
    ///
    /// Returns `Ok(None)` when not enough bits are buffered to resolve a
    /// full code; nothing is consumed in that case, so the caller can
    /// supply more input and retry.
    pub fn get_symbol(&self, input: &mut BitInput) -> Result<Option<u16>> {
        if let Some(look) = input.peek_bits(ROOT_BITS as u32) {
            let entry = self.tree[look as usize];
            if entry >= 0 {
                let bits = (entry & 15) as u32;
                if bits == 0 {
                    return Err(FlateError::invalid_huffman(input.bit_position()));
                }
                input.drop_bits(bits);
                return Ok(Some((entry >> 4) as u16));
            }

            // Long code: follow the sub-table pointer.
            let sub_bits = (entry & 15) as u32;
            let base = (-(entry >> 4)) as usize;
            if let Some(look2) = input.peek_bits(sub_bits) {
                let entry2 = self.tree[base + (look2 as usize >> ROOT_BITS)];
                let bits = (entry2 & 15) as u32;
                if entry2 < 0 || bits == 0 {
                    return Err(FlateError::invalid_huffman(input.bit_position()));
                }
                input.drop_bits(bits);
                Ok(Some((entry2 >> 4) as u16))
            } else {
                // Fewer bits than the widest code in this group; the code
                // may still resolve if it is short enough.
                let avail = input.available_bits();
                let look2 = input.peek_bits(avail).unwrap_or(0);
                let entry2 = self.tree[base + (look2 as usize >> ROOT_BITS)];
                let bits = (entry2 & 15) as u32;
                if entry2 >= 0 && bits > 0 && bits <= avail {
                    input.drop_bits(bits);
                    Ok(Some((entry2 >> 4) as u16))
                } else {
                    Ok(None)
                }
            }
        } else {
            // Fewer than ROOT_BITS available; try to resolve a short code.
            let avail = input.available_bits();
            if avail == 0 {
                return Ok(None);
            }
            let look = input.peek_bits(avail).unwrap_or(0);
            let entry = self.tree[look as usize];
            let bits = (entry & 15) as u32;
            if entry >= 0 && bits > 0 && bits <= avail {
                input.drop_bits(bits);
                Ok(Some((entry >> 4) as u16))
            } else {
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// One frequency-counted Huffman tree on the encoding side.
#[derive(Debug)]
struct EncTree {
    freqs: Vec<u16>,
    codes: Vec<u16>,
    lengths: Vec<u8>,
    min_num_codes: usize,
    num_codes: usize,
    max_length: usize,
}

impl EncTree {
    fn new(alphabet_size: usize, min_num_codes: usize, max_length: usize) -> Self {
        Self {
            freqs: vec![0; alphabet_size],
            codes: vec![0; alphabet_size],
            lengths: vec![0; alphabet_size],
            min_num_codes,
            num_codes: 0,
            max_length,
        }
    }

    fn reset(&mut self) {
        self.freqs.fill(0);
        self.codes.fill(0);
        self.lengths.fill(0);
        self.num_codes = 0;
    }

    /// Sum of code bits for the recorded frequencies (extra bits are
    /// accounted separately by the coder).
    fn data_bits(&self) -> usize {
        self.freqs
            .iter()
            .zip(&self.lengths)
            .map(|(&f, &l)| f as usize * l as usize)
            .sum()
    }

    /// Build optimal length-limited code lengths and canonical codes
    /// from the recorded frequencies.
    ///
    /// Tree construction repeatedly merges the two least-frequent nodes,
    /// with ties broken by merge depth and then heap order so the result
    /// is deterministic. Lengths are capped at `max_length`; if capping
    /// overflows the code space, lengths are redistributed over the
    /// bit-length histogram, moving overflowed leaves up one level at
    /// the cost of deepening one shorter code.
    fn build_tree(&mut self) {
        let num_symbols = self.freqs.len();

        // Work arrays covering leaves (symbol ids) and internal nodes.
        let mut freq = vec![0u32; 2 * num_symbols];
        let mut dad = vec![0usize; 2 * num_symbols];
        let mut depth = vec![0u8; 2 * num_symbols];

        let mut heap: Vec<usize> = Vec::with_capacity(num_symbols);
        let mut max_code: isize = -1;
        for (n, &f) in self.freqs.iter().enumerate() {
            if f != 0 {
                freq[n] = u32::from(f);
                heap.push(n);
                max_code = n as isize;
            } else {
                self.lengths[n] = 0;
            }
        }

        // The format requires at least two codes so that no zero-bit
        // code can arise; force phantom symbols if needed.
        while heap.len() < 2 {
            let node = if max_code < 2 {
                max_code += 1;
                max_code as usize
            } else {
                0
            };
            freq[node] = 1;
            self.freqs[node] = 1;
            heap.push(node);
        }
        self.num_codes = (max_code as usize + 1).max(self.min_num_codes);

        let smaller = |freq: &[u32], depth: &[u8], n: usize, m: usize| {
            freq[n] < freq[m] || (freq[n] == freq[m] && depth[n] <= depth[m])
        };

        fn sift_down(
            heap: &mut [usize],
            len: usize,
            mut k: usize,
            freq: &[u32],
            depth: &[u8],
            smaller: &impl Fn(&[u32], &[u8], usize, usize) -> bool,
        ) {
            let v = heap[k];
            loop {
                let mut j = 2 * k + 1;
                if j >= len {
                    break;
                }
                if j + 1 < len && smaller(freq, depth, heap[j + 1], heap[j]) {
                    j += 1;
                }
                if smaller(freq, depth, v, heap[j]) {
                    break;
                }
                heap[k] = heap[j];
                k = j;
            }
            heap[k] = v;
        }

        let mut heap_len = heap.len();
        for k in (0..heap_len / 2).rev() {
            sift_down(&mut heap, heap_len, k, &freq, &depth, &smaller);
        }

        // Merge order, children before parents, root last.
        let mut order: Vec<usize> = Vec::with_capacity(2 * heap_len);
        let mut node = num_symbols;
        while heap_len >= 2 {
            let n = heap[0];
            heap[0] = heap[heap_len - 1];
            heap_len -= 1;
            sift_down(&mut heap, heap_len, 0, &freq, &depth, &smaller);
            let m = heap[0];

            order.push(n);
            order.push(m);
            freq[node] = freq[n] + freq[m];
            depth[node] = depth[n].max(depth[m]) + 1;
            dad[n] = node;
            dad[m] = node;

            heap[0] = node;
            node += 1;
            sift_down(&mut heap, heap_len, 0, &freq, &depth, &smaller);
        }
        let root = heap[0];
        order.push(root);

        // Assign bit lengths top-down, counting overflow past the limit.
        let mut node_len = vec![0u8; 2 * num_symbols];
        let mut bl_count = [0u16; MAX_BITLEN + 1];
        let mut overflow: i32 = 0;
        node_len[root] = 0;
        for &n in order.iter().rev().skip(1) {
            let mut bits = node_len[dad[n]] as usize + 1;
            if bits > self.max_length {
                bits = self.max_length;
                overflow += 1;
            }
            node_len[n] = bits as u8;
            if n < num_symbols {
                bl_count[bits] += 1;
            }
        }

        if overflow == 0 {
            for &n in &order {
                if n < num_symbols {
                    self.lengths[n] = node_len[n];
                }
            }
        } else {
            // Redistribute: move one leaf from the deepest underfull
            // level down a level, freeing a slot at the limit.
            loop {
                let mut bits = self.max_length - 1;
                while bl_count[bits] == 0 {
                    bits -= 1;
                }
                bl_count[bits] -= 1;
                bl_count[bits + 1] += 2;
                bl_count[self.max_length] -= 1;
                overflow -= 2;
                if overflow <= 0 {
                    break;
                }
            }

            // Reassign lengths from the histogram, walking leaves from
            // least to most frequent so the longest codes land on the
            // rarest symbols.
            let mut leaves = order.iter().filter(|&&n| n < num_symbols);
            for bits in (1..=self.max_length).rev() {
                let mut n = bl_count[bits];
                while n > 0 {
                    let &leaf = leaves.next().expect("leaf counts match histogram");
                    self.lengths[leaf] = bits as u8;
                    n -= 1;
                }
            }
        }

        Self::build_codes(&self.lengths, &mut self.codes);
    }

    /// Assign canonical codes (bit-reversed for LSB-first output) from
    /// final code lengths.
    fn build_codes(lengths: &[u8], codes: &mut [u16]) {
        let mut bl_count = [0u16; MAX_BITLEN + 1];
        for &len in lengths {
            if len > 0 {
                bl_count[len as usize] += 1;
            }
        }

        let mut next_code = [0u16; MAX_BITLEN + 1];
        let mut code = 0u16;
        for bits in 1..=MAX_BITLEN {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        for (symbol, &len) in lengths.iter().enumerate() {
            if len > 0 {
                let len = len as usize;
                codes[symbol] = reverse_bits(u32::from(next_code[len]), len as u32) as u16;
                next_code[len] += 1;
            }
        }
    }

    /// Record this tree's code lengths into the bit-length tree's
    /// frequencies, using the header run-length encoding.
    fn calc_bl_freq(&self, bl_tree: &mut EncTree) {
        let mut curlen: i32 = -1;
        let mut i = 0;
        while i < self.num_codes {
            let nextlen = i32::from(self.lengths[i]);
            let (max_count, min_count) = if nextlen == 0 { (138, 3) } else { (6, 3) };

            let mut count = 1;
            if nextlen != 0 && curlen != nextlen {
                bl_tree.freqs[nextlen as usize] += 1;
                count = 0;
            }
            curlen = nextlen;
            i += 1;
            while i < self.num_codes && curlen == i32::from(self.lengths[i]) {
                i += 1;
                count += 1;
                if count >= max_count {
                    break;
                }
            }

            if count < min_count {
                bl_tree.freqs[curlen as usize] += count as u16;
            } else if curlen != 0 {
                bl_tree.freqs[REP_3_6] += 1;
            } else if count <= 10 {
                bl_tree.freqs[REP_3_10] += 1;
            } else {
                bl_tree.freqs[REP_11_138] += 1;
            }
        }
    }

    /// Emit this tree's code lengths using the bit-length tree's codes.
    /// Must mirror [`EncTree::calc_bl_freq`] exactly.
    fn write_tree(&self, bl_tree: &EncTree, pending: &mut BitOutput) {
        let mut curlen: i32 = -1;
        let mut i = 0;
        while i < self.num_codes {
            let nextlen = i32::from(self.lengths[i]);
            let (max_count, min_count) = if nextlen == 0 { (138, 3) } else { (6, 3) };

            let mut count = 1;
            if nextlen != 0 && curlen != nextlen {
                bl_tree.write_symbol(nextlen as usize, pending);
                count = 0;
            }
            curlen = nextlen;
            i += 1;
            while i < self.num_codes && curlen == i32::from(self.lengths[i]) {
                i += 1;
                count += 1;
                if count >= max_count {
                    break;
                }
            }

            if count < min_count {
                for _ in 0..count {
                    bl_tree.write_symbol(curlen as usize, pending);
                }
            } else if curlen != 0 {
                bl_tree.write_symbol(REP_3_6, pending);
                pending.write_bits(count as u32 - 3, 2);
            } else if count <= 10 {
                bl_tree.write_symbol(REP_3_10, pending);
                pending.write_bits(count as u32 - 3, 3);
            } else {
                bl_tree.write_symbol(REP_11_138, pending);
                pending.write_bits(count as u32 - 11, 7);
            }
        }
    }

    #[inline]
    fn write_symbol(&self, symbol: usize, pending: &mut BitOutput) {
        pending.write_bits(u32::from(self.codes[symbol]), u32::from(self.lengths[symbol]));
    }
}

/// Static literal/length codes and lengths (RFC 1951 section 3.2.6),
/// bit-reversed ready for emission.
fn static_litlen_codes() -> &'static ([u16; 288], [u8; 288]) {
    static CODES: OnceLock<([u16; 288], [u8; 288])> = OnceLock::new();
    CODES.get_or_init(|| {
        let lengths = fixed_litlen_lengths();
        let mut codes = [0u16; 288];
        EncTree::build_codes(&lengths, &mut codes);
        (codes, lengths)
    })
}

/// Static distance codes: 5 bits each, bit-reversed.
fn static_distance_codes() -> &'static ([u16; 30], [u8; 30]) {
    static CODES: OnceLock<([u16; 30], [u8; 30])> = OnceLock::new();
    CODES.get_or_init(|| {
        let mut codes = [0u16; 30];
        for (i, code) in codes.iter_mut().enumerate() {
            *code = reverse_bits(i as u32, 5) as u16;
        }
        (codes, [5u8; 30])
    })
}

/// The encoder's Huffman stage: accumulates a block's symbols and
/// frequencies, then emits the block in whichever of the three DEFLATE
/// encodings is estimated to be smallest.
#[derive(Debug)]
pub struct HuffmanCoder {
    pending: BitOutput,
    literal_tree: EncTree,
    distance_tree: EncTree,
    bitlen_tree: EncTree,
    /// Per-symbol distance (0 = literal).
    dist_buf: Vec<u16>,
    /// Literal byte, or match length - 3 when the distance is nonzero.
    litlen_buf: Vec<u8>,
    /// Extra bits owed by the buffered matches.
    extra_bits: usize,
}

impl HuffmanCoder {
    /// Create an empty coder.
    pub fn new() -> Self {
        Self {
            pending: BitOutput::new(),
            // 288 slots so the static code table fits the same arrays.
            literal_tree: EncTree::new(288, 257, MAX_BITLEN),
            distance_tree: EncTree::new(DISTANCE_ALPHABET_SIZE, 1, MAX_BITLEN),
            bitlen_tree: EncTree::new(19, 4, MAX_BL_BITLEN),
            dist_buf: Vec::with_capacity(BUFFER_SIZE),
            litlen_buf: Vec::with_capacity(BUFFER_SIZE),
            extra_bits: 0,
        }
    }

    /// Access the pending output buffer.
    pub fn pending(&mut self) -> &mut BitOutput {
        &mut self.pending
    }

    /// Whether all pending output bytes have been drained.
    pub fn pending_is_flushed(&self) -> bool {
        self.pending.is_flushed()
    }

    /// Record a literal byte. Returns true when the block buffer is full.
    pub fn tally_lit(&mut self, literal: u8) -> bool {
        self.dist_buf.push(0);
        self.litlen_buf.push(literal);
        self.literal_tree.freqs[literal as usize] += 1;
        self.is_full()
    }

    /// Record a back-reference. Returns true when the block buffer is full.
    pub fn tally_dist(&mut self, distance: u16, length: u16) -> bool {
        debug_assert!((1..=32768).contains(&distance));
        debug_assert!((3..=258).contains(&length));
        self.dist_buf.push(distance);
        self.litlen_buf.push((length as usize - MIN_MATCH) as u8);

        let (len_code, len_extra, _) = length_to_code(length);
        self.literal_tree.freqs[len_code as usize] += 1;
        self.extra_bits += len_extra as usize;

        let (dist_code, dist_extra, _) = distance_to_code(distance);
        self.distance_tree.freqs[dist_code as usize] += 1;
        self.extra_bits += dist_extra as usize;

        self.is_full()
    }

    /// Whether the block buffer has reached capacity.
    pub fn is_full(&self) -> bool {
        self.litlen_buf.len() >= BUFFER_SIZE
    }

    /// Emit an explicitly stored block.
    pub fn flush_stored_block(&mut self, stored: &[u8], last_block: bool) {
        debug_assert!(stored.len() <= 0xffff);
        self.pending.write_bits(u32::from(last_block), 3);
        self.pending.align_to_byte();
        self.pending.write_short(stored.len() as u16);
        self.pending.write_short(!(stored.len() as u16));
        self.pending.write_block(stored);
    }

    /// Close out the buffered block, choosing stored, static, or dynamic
    /// encoding by estimated size. `stored` is the block's raw bytes
    /// when they are still available in the compressor's window.
    pub fn flush_block(&mut self, stored: Option<&[u8]>, last_block: bool) {
        self.literal_tree.freqs[END_OF_BLOCK] += 1;

        self.literal_tree.build_tree();
        self.distance_tree.build_tree();

        self.literal_tree.calc_bl_freq(&mut self.bitlen_tree);
        self.distance_tree.calc_bl_freq(&mut self.bitlen_tree);
        self.bitlen_tree.build_tree();

        let mut bl_tree_codes = 4;
        for rank in (4..19).rev() {
            if self.bitlen_tree.lengths[CODE_LENGTH_ORDER[rank]] > 0 {
                bl_tree_codes = rank + 1;
                break;
            }
        }

        let bl_bits = self.bitlen_tree.data_bits()
            + 2 * self.bitlen_tree.freqs[REP_3_6] as usize
            + 3 * self.bitlen_tree.freqs[REP_3_10] as usize
            + 7 * self.bitlen_tree.freqs[REP_11_138] as usize;
        let mut opt_len = 14
            + bl_tree_codes * 3
            + bl_bits
            + self.literal_tree.data_bits()
            + self.distance_tree.data_bits()
            + self.extra_bits;

        let (static_lit_codes, static_lit_lengths) = static_litlen_codes();
        let static_len = self.extra_bits
            + self
                .literal_tree
                .freqs
                .iter()
                .zip(static_lit_lengths.iter())
                .map(|(&f, &l)| f as usize * l as usize)
                .sum::<usize>()
            + self
                .distance_tree
                .freqs
                .iter()
                .map(|&f| f as usize * 5)
                .sum::<usize>();

        let use_static = static_len <= opt_len;
        if use_static {
            opt_len = static_len;
        }

        if let Some(stored) = stored {
            // A stored block costs its length plus LEN/NLEN and padding.
            if stored.len() + 4 < opt_len >> 3 {
                self.flush_stored_block(stored, last_block);
                self.reset_block();
                return;
            }
        }

        if use_static {
            self.pending
                .write_bits((1 << 1) | u32::from(last_block), 3);
            let (static_dist_codes, static_dist_lengths) = static_distance_codes();
            Self::compress_block(
                &mut self.pending,
                &self.dist_buf,
                &self.litlen_buf,
                static_lit_codes,
                static_lit_lengths,
                static_dist_codes,
                static_dist_lengths,
            );
        } else {
            self.pending
                .write_bits((2 << 1) | u32::from(last_block), 3);
            self.send_all_trees(bl_tree_codes);
            Self::compress_block(
                &mut self.pending,
                &self.dist_buf,
                &self.litlen_buf,
                &self.literal_tree.codes,
                &self.literal_tree.lengths,
                &self.distance_tree.codes,
                &self.distance_tree.lengths,
            );
        }

        self.reset_block();
    }

    /// Emit the dynamic header: HLIT/HDIST/HCLEN, the bit-length code
    /// lengths in transmission order, then both RLE-coded trees.
    fn send_all_trees(&mut self, bl_tree_codes: usize) {
        self.pending
            .write_bits((self.literal_tree.num_codes - 257) as u32, 5);
        self.pending
            .write_bits((self.distance_tree.num_codes - 1) as u32, 5);
        self.pending.write_bits((bl_tree_codes - 4) as u32, 4);
        for rank in 0..bl_tree_codes {
            self.pending.write_bits(
                u32::from(self.bitlen_tree.lengths[CODE_LENGTH_ORDER[rank]]),
                3,
            );
        }
        self.literal_tree.write_tree(&self.bitlen_tree, &mut self.pending);
        self.distance_tree.write_tree(&self.bitlen_tree, &mut self.pending);
    }

    /// Emit the buffered symbols followed by the end-of-block code.
    #[allow(clippy::too_many_arguments)]
    fn compress_block(
        pending: &mut BitOutput,
        dist_buf: &[u16],
        litlen_buf: &[u8],
        lit_codes: &[u16],
        lit_lengths: &[u8],
        dist_codes: &[u16],
        dist_lengths: &[u8],
    ) {
        for (&dist, &litlen) in dist_buf.iter().zip(litlen_buf) {
            if dist == 0 {
                let sym = litlen as usize;
                pending.write_bits(u32::from(lit_codes[sym]), u32::from(lit_lengths[sym]));
            } else {
                let length = u16::from(litlen) + MIN_MATCH as u16;
                let (len_code, len_extra_bits, len_extra) = length_to_code(length);
                pending.write_bits(
                    u32::from(lit_codes[len_code as usize]),
                    u32::from(lit_lengths[len_code as usize]),
                );
                if len_extra_bits > 0 {
                    pending.write_bits(u32::from(len_extra), u32::from(len_extra_bits));
                }

                let (dist_code, dist_extra_bits, dist_extra) = distance_to_code(dist);
                pending.write_bits(
                    u32::from(dist_codes[dist_code as usize]),
                    u32::from(dist_lengths[dist_code as usize]),
                );
                if dist_extra_bits > 0 {
                    pending.write_bits(u32::from(dist_extra), u32::from(dist_extra_bits));
                }
            }
        }
        pending.write_bits(
            u32::from(lit_codes[END_OF_BLOCK]),
            u32::from(lit_lengths[END_OF_BLOCK]),
        );
    }

    fn reset_block(&mut self) {
        self.literal_tree.reset();
        self.distance_tree.reset();
        self.bitlen_tree.reset();
        self.dist_buf.clear();
        self.litlen_buf.clear();
        self.extra_bits = 0;
    }

    /// Reset the coder, including any pending output.
    pub fn reset(&mut self) {
        self.reset_block();
        self.pending.reset();
    }
}

impl Default for HuffmanCoder {
    fn default() -> Self {
        Self::new()
    }
}
