//! LZ77 compression engine for DEFLATE.
//!
//! Maintains a sliding window over recent input and a hash-chain index
//! of every 3-byte sequence in it. For each position the engine either
//! emits a literal or a back-reference to the longest match found along
//! the hash chain, subject to per-level effort limits. Completed blocks
//! are handed to the Huffman stage.
//!
//! The window is twice the DEFLATE distance limit; when the write cursor
//! approaches its end, the upper half slides down and every stored
//! position (hash heads, chain links, match and block cursors) is
//! rebased by the slide distance, clamping references to discarded
//! history to zero.

use crate::huffman::HuffmanCoder;
use crate::tables::{MAX_MATCH, MIN_MATCH};
use ferroflate_core::bitstream::BitOutput;
use ferroflate_core::checksum::Adler32;
use ferroflate_core::error::{FlateError, Result};

/// Sliding window size (the DEFLATE distance limit).
pub const WSIZE: usize = 1 << 15;
const WMASK: usize = WSIZE - 1;

const HASH_BITS: usize = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const HASH_MASK: usize = HASH_SIZE - 1;
/// Rolling hash shift; three shifts cover all HASH_BITS.
const HASH_SHIFT: usize = (HASH_BITS + MIN_MATCH - 1) / MIN_MATCH;

/// Keep this much lookahead when matching so a maximum-length match
/// never reads past the window contents.
const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Maximum back-reference distance the engine will emit.
pub const MAX_DIST: usize = WSIZE - MIN_LOOKAHEAD;

/// Largest stored block the format can frame (16-bit LEN field).
const MAX_BLOCK_SIZE: usize = 0xffff;

/// Length-3 matches farther back than this cost more than they save.
const TOO_FAR: usize = 4096;

/// Match-emission policy, selectable per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeflateStrategy {
    /// Use matches and literals freely.
    #[default]
    Default,
    /// Drop short matches; suits data with many small random runs
    /// (e.g. image rows already filtered).
    Filtered,
    /// Huffman-code literals only, never emit matches.
    HuffmanOnly,
}

/// Which compression loop a level maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompressionFunction {
    Stored,
    Fast,
    Slow,
}

/// Per-level effort tunables, indexed by compression level.
struct Config {
    /// Shorten the chain search once a match this long is found.
    good_length: usize,
    /// Longest match still eligible for lazy deferral.
    max_lazy: usize,
    /// Stop searching outright at a match this long.
    nice_length: usize,
    /// Hash-chain walk limit.
    max_chain: usize,
    func: CompressionFunction,
}

impl Config {
    const fn new(
        good_length: usize,
        max_lazy: usize,
        nice_length: usize,
        max_chain: usize,
        func: CompressionFunction,
    ) -> Self {
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
            func,
        }
    }
}

const CONFIG_TABLE: [Config; 10] = [
    Config::new(0, 0, 0, 0, CompressionFunction::Stored),
    Config::new(4, 4, 8, 4, CompressionFunction::Fast),
    Config::new(4, 5, 16, 8, CompressionFunction::Fast),
    Config::new(4, 6, 32, 32, CompressionFunction::Fast),
    Config::new(4, 4, 16, 16, CompressionFunction::Slow),
    Config::new(8, 16, 32, 32, CompressionFunction::Slow),
    Config::new(8, 16, 128, 128, CompressionFunction::Slow),
    Config::new(8, 32, 128, 256, CompressionFunction::Slow),
    Config::new(32, 128, 258, 1024, CompressionFunction::Slow),
    Config::new(32, 258, 258, 4096, CompressionFunction::Slow),
];

/// The LZ77 compression engine.
#[derive(Debug)]
pub struct DeflaterEngine {
    /// Sliding window, twice the distance limit.
    window: Vec<u8>,
    /// `head[hash]`: most recent window position with that 3-byte hash.
    head: Vec<u16>,
    /// `prev[pos & WMASK]`: previous position sharing the hash.
    prev: Vec<u16>,
    /// Rolling hash context for the bytes at `strstart`.
    ins_h: usize,
    /// Start of the best match found for the current position.
    match_start: usize,
    /// Length of that match.
    match_len: usize,
    /// A literal at `strstart - 1` is deferred, pending lazy evaluation.
    prev_available: bool,
    /// Start of the block being accumulated. Negative once a window
    /// slide has discarded the block's first bytes, in which case the
    /// stored-block option is off the table.
    block_start: isize,
    /// Current position in the window.
    strstart: usize,
    /// Valid bytes in the window at and after `strstart`.
    lookahead: usize,
    /// Owned copy of the caller's current input chunk.
    input: Vec<u8>,
    input_off: usize,
    total_in: u64,
    strategy: DeflateStrategy,
    good_length: usize,
    max_lazy: usize,
    nice_length: usize,
    max_chain: usize,
    func: CompressionFunction,
    huffman: HuffmanCoder,
    adler: Adler32,
}

impl DeflaterEngine {
    /// Create an engine for the given compression level (0-9).
    pub fn new(level: u8) -> Self {
        let mut engine = Self {
            window: vec![0; 2 * WSIZE],
            head: vec![0; HASH_SIZE],
            prev: vec![0; WSIZE],
            ins_h: 0,
            match_start: 0,
            match_len: MIN_MATCH - 1,
            prev_available: false,
            block_start: 1,
            strstart: 1,
            lookahead: 0,
            input: Vec::new(),
            input_off: 0,
            total_in: 0,
            strategy: DeflateStrategy::Default,
            good_length: 0,
            max_lazy: 0,
            nice_length: 0,
            max_chain: 0,
            func: CompressionFunction::Stored,
            huffman: HuffmanCoder::new(),
            adler: Adler32::new(),
        };
        engine.set_level(level);
        engine
    }

    /// Reset for a fresh stream, reusing all buffers.
    pub fn reset(&mut self) {
        self.huffman.reset();
        self.adler.reset();
        self.head.fill(0);
        self.prev.fill(0);
        self.ins_h = 0;
        self.match_start = 0;
        self.match_len = MIN_MATCH - 1;
        self.prev_available = false;
        // Position 0 is reserved so a zero hash head means "empty".
        self.block_start = 1;
        self.strstart = 1;
        self.lookahead = 0;
        self.input.clear();
        self.input_off = 0;
        self.total_in = 0;
    }

    /// Adler-32 of all input consumed so far.
    pub fn adler(&self) -> u32 {
        self.adler.value()
    }

    /// Restart the Adler-32 accumulator (after the dictionary id has
    /// been written).
    pub fn reset_adler(&mut self) {
        self.adler.reset();
    }

    /// Total bytes of input consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Access the pending output buffer.
    pub fn pending(&mut self) -> &mut BitOutput {
        self.huffman.pending()
    }

    /// Whether pending output has been fully drained.
    pub fn pending_is_flushed(&self) -> bool {
        self.huffman.pending_is_flushed()
    }

    /// Apply a compression level's effort tunables. Takes effect from
    /// the next block.
    pub fn set_level(&mut self, level: u8) {
        let config = &CONFIG_TABLE[level.min(9) as usize];
        self.good_length = config.good_length;
        self.max_lazy = config.max_lazy;
        self.nice_length = config.nice_length;
        self.max_chain = config.max_chain;
        self.func = config.func;
    }

    /// Set the match-emission strategy.
    pub fn set_strategy(&mut self, strategy: DeflateStrategy) {
        self.strategy = strategy;
    }

    /// Supply the next chunk of input.
    ///
    /// Fails if the previous chunk has not been fully consumed.
    pub fn set_input(&mut self, buf: &[u8]) -> Result<()> {
        if self.input_off < self.input.len() {
            return Err(FlateError::invalid_state(
                "previous input was not consumed yet",
            ));
        }
        self.input.clear();
        self.input.extend_from_slice(buf);
        self.input_off = 0;
        Ok(())
    }

    /// Whether all supplied input has been consumed.
    pub fn needs_input(&self) -> bool {
        self.input_off == self.input.len()
    }

    /// Preload a dictionary. Must be called on a fresh engine, before
    /// any input.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        debug_assert_eq!(self.strstart, 1, "dictionary requires a fresh stream");
        self.adler.update(dictionary);
        if dictionary.len() < MIN_MATCH {
            return;
        }

        // Only the last MAX_DIST bytes are reachable.
        let dict = if dictionary.len() > MAX_DIST {
            &dictionary[dictionary.len() - MAX_DIST..]
        } else {
            dictionary
        };

        self.window[self.strstart..self.strstart + dict.len()].copy_from_slice(dict);
        self.update_hash();
        for _ in 0..dict.len() - 2 {
            self.insert_string();
            self.strstart += 1;
        }
        self.strstart += 2;
        self.block_start = self.strstart as isize;
    }

    #[inline]
    fn update_hash(&mut self) {
        self.ins_h = (usize::from(self.window[self.strstart]) << HASH_SHIFT)
            ^ usize::from(self.window[self.strstart + 1]);
    }

    /// Insert the 3-byte sequence at `strstart` into the hash chain and
    /// return the previous head (0 = none).
    #[inline]
    fn insert_string(&mut self) -> usize {
        let hash = ((self.ins_h << HASH_SHIFT)
            ^ usize::from(self.window[self.strstart + (MIN_MATCH - 1)]))
            & HASH_MASK;
        let head = usize::from(self.head[hash]);
        self.prev[self.strstart & WMASK] = head as u16;
        self.head[hash] = self.strstart as u16;
        self.ins_h = hash;
        head
    }

    fn slide_window(&mut self) {
        self.window.copy_within(WSIZE.., 0);
        // A deferred match can sit one position behind a slide with its
        // start just below the slide point; wrapping keeps the distance
        // arithmetic exact either way.
        self.match_start = self.match_start.wrapping_sub(WSIZE);
        self.strstart -= WSIZE;
        self.block_start -= WSIZE as isize;

        for entry in &mut self.head {
            let pos = usize::from(*entry);
            *entry = if pos >= WSIZE { (pos - WSIZE) as u16 } else { 0 };
        }
        for entry in &mut self.prev {
            let pos = usize::from(*entry);
            *entry = if pos >= WSIZE { (pos - WSIZE) as u16 } else { 0 };
        }
    }

    /// Move input into the window and re-prime the rolling hash.
    fn fill_window(&mut self) {
        if self.strstart >= WSIZE + MAX_DIST {
            self.slide_window();
        }

        while self.lookahead < MIN_LOOKAHEAD && self.input_off < self.input.len() {
            let more = (2 * WSIZE - self.lookahead - self.strstart)
                .min(self.input.len() - self.input_off);
            if more == 0 {
                break;
            }
            let dst = self.strstart + self.lookahead;
            self.window[dst..dst + more]
                .copy_from_slice(&self.input[self.input_off..self.input_off + more]);
            self.adler
                .update(&self.input[self.input_off..self.input_off + more]);
            self.input_off += more;
            self.total_in += more as u64;
            self.lookahead += more;
        }

        if self.lookahead >= MIN_MATCH {
            self.update_hash();
        }
    }

    /// Walk the hash chain from `cur_match` looking for the longest
    /// match at `strstart` that beats the current `match_len`.
    ///
    /// The chain is scanned most-recent-first and only a strictly longer
    /// match replaces the best one, so the result is deterministic: the
    /// first (nearest) match at the greatest length wins.
    fn find_longest_match(&mut self, mut cur_match: usize) -> bool {
        let strstart = self.strstart;
        let max_len = MAX_MATCH.min(self.lookahead);
        let mut best_len = self.match_len.max(MIN_MATCH - 1);
        if best_len >= max_len {
            return self.match_len >= MIN_MATCH;
        }

        let limit = strstart.saturating_sub(MAX_DIST);
        let nice_length = self.nice_length.min(self.lookahead);
        let mut chain_length = self.max_chain;
        if best_len >= self.good_length {
            chain_length >>= 2;
        }

        let window = &self.window;
        loop {
            // Cheap rejection: the byte past the current best must match
            // before a full compare is worth it.
            if window[cur_match + best_len] == window[strstart + best_len]
                && window[cur_match] == window[strstart]
            {
                let mut len = 1;
                while len < max_len && window[cur_match + len] == window[strstart + len] {
                    len += 1;
                }
                if len > best_len {
                    self.match_start = cur_match;
                    best_len = len;
                    if len >= nice_length {
                        break;
                    }
                }
            }

            chain_length -= 1;
            if chain_length == 0 {
                break;
            }
            let next = usize::from(self.prev[cur_match & WMASK]);
            if next <= limit || next >= cur_match {
                break;
            }
            cur_match = next;
        }

        self.match_len = best_len;
        best_len >= MIN_MATCH
    }

    /// Flush the accumulated block through the Huffman stage.
    ///
    /// `deferred` excludes a lazily-held literal from the block length.
    fn flush_block(&mut self, deferred: usize, last_block: bool) {
        let end = self.strstart - deferred;
        let stored = if self.block_start >= 0 {
            Some(&self.window[self.block_start as usize..end])
        } else {
            None
        };
        self.huffman.flush_block(stored, last_block);
        self.block_start = end as isize;
    }

    /// Level 0: pass input through as stored blocks.
    fn deflate_stored(&mut self, flush: bool, finish: bool) -> bool {
        if !flush && self.lookahead == 0 {
            return false;
        }

        self.strstart += self.lookahead;
        self.lookahead = 0;
        let mut stored_len = (self.strstart as isize - self.block_start) as usize;

        if stored_len >= MAX_BLOCK_SIZE
            || (self.block_start < WSIZE as isize && stored_len >= MAX_DIST)
            || flush
        {
            // Only the emission that covers the very end of the input
            // may carry the final-block flag.
            let mut last_block = finish && self.input_off == self.input.len();
            if stored_len > MAX_BLOCK_SIZE {
                stored_len = MAX_BLOCK_SIZE;
                last_block = false;
            }

            let start = self.block_start as usize;
            let huffman = &mut self.huffman;
            huffman.flush_stored_block(&self.window[start..start + stored_len], last_block);
            self.block_start += stored_len as isize;
            return !last_block;
        }
        true
    }

    /// Levels 1-3: greedy matching.
    fn deflate_fast(&mut self, flush: bool, finish: bool) -> bool {
        if self.lookahead < MIN_LOOKAHEAD && !flush {
            return false;
        }

        while self.lookahead >= MIN_LOOKAHEAD || flush {
            if self.lookahead == 0 {
                // Everything is tallied; close the block.
                self.flush_block(0, finish);
                return false;
            }

            if self.strstart > 2 * WSIZE - MIN_LOOKAHEAD {
                self.slide_window();
            }

            let mut hash_head = 0;
            if self.lookahead >= MIN_MATCH {
                hash_head = self.insert_string();
            }

            let full;
            if hash_head != 0
                && self.strategy != DeflateStrategy::HuffmanOnly
                && self.strstart - hash_head <= MAX_DIST
                && self.find_longest_match(hash_head)
            {
                full = self
                    .huffman
                    .tally_dist((self.strstart - self.match_start) as u16, self.match_len as u16);

                self.lookahead -= self.match_len;
                if self.match_len <= self.max_lazy && self.lookahead >= MIN_MATCH {
                    // Index every position inside the match.
                    for _ in 1..self.match_len {
                        self.strstart += 1;
                        self.insert_string();
                    }
                    self.strstart += 1;
                } else {
                    self.strstart += self.match_len;
                    if self.lookahead >= MIN_MATCH - 1 {
                        self.update_hash();
                    }
                }
                self.match_len = MIN_MATCH - 1;
            } else {
                full = self.huffman.tally_lit(self.window[self.strstart]);
                self.strstart += 1;
                self.lookahead -= 1;
            }

            if full {
                let last_block = finish && self.lookahead == 0;
                self.flush_block(0, last_block);
                return !last_block;
            }
        }
        true
    }

    /// Levels 4-9: lazy matching. A found match is held back one
    /// position to see whether a longer one starts at the next byte.
    fn deflate_slow(&mut self, flush: bool, finish: bool) -> bool {
        if self.lookahead < MIN_LOOKAHEAD && !flush {
            return false;
        }

        while self.lookahead >= MIN_LOOKAHEAD || flush {
            if self.lookahead == 0 {
                if self.prev_available {
                    self.huffman.tally_lit(self.window[self.strstart - 1]);
                    self.prev_available = false;
                }
                debug_assert!(
                    self.match_len < MIN_MATCH,
                    "match must not be pending at flush"
                );
                self.flush_block(0, finish);
                return false;
            }

            if self.strstart >= 2 * WSIZE - MIN_LOOKAHEAD {
                self.slide_window();
            }

            let prev_match = self.match_start;
            let prev_len = self.match_len;

            if self.lookahead >= MIN_MATCH {
                let hash_head = self.insert_string();
                if hash_head != 0
                    && self.strategy != DeflateStrategy::HuffmanOnly
                    && self.strstart - hash_head <= MAX_DIST
                    && self.find_longest_match(hash_head)
                {
                    // Discard matches that cost more than they save.
                    if self.match_len <= 5
                        && (self.strategy == DeflateStrategy::Filtered
                            || (self.match_len == MIN_MATCH
                                && self.strstart - self.match_start > TOO_FAR))
                    {
                        self.match_len = MIN_MATCH - 1;
                    }
                }
            }

            let full;
            if prev_len >= MIN_MATCH && self.match_len <= prev_len {
                // The deferred match was as good as anything here.
                let distance = (self.strstart - 1).wrapping_sub(prev_match) as u16;
                full = self.huffman.tally_dist(distance, prev_len as u16);

                for _ in 0..prev_len - 2 {
                    self.strstart += 1;
                    self.lookahead -= 1;
                    if self.lookahead >= MIN_MATCH {
                        self.insert_string();
                    }
                }
                self.strstart += 1;
                self.lookahead -= 1;
                self.prev_available = false;
                self.match_len = MIN_MATCH - 1;
            } else {
                if self.prev_available {
                    full = self.huffman.tally_lit(self.window[self.strstart - 1]);
                } else {
                    full = false;
                }
                self.prev_available = true;
                self.strstart += 1;
                self.lookahead -= 1;
            }

            if full || self.huffman.is_full() {
                let deferred = usize::from(self.prev_available);
                let last_block = finish && self.lookahead == 0 && !self.prev_available;
                self.flush_block(deferred, last_block);
                return !last_block;
            }
        }
        true
    }

    /// Drive compression: fill the window from input and run the
    /// level's loop until a block lands in the pending buffer or input
    /// runs dry. Returns whether further progress is possible.
    pub fn deflate(&mut self, flush: bool, finish: bool) -> bool {
        let mut progress;
        loop {
            self.fill_window();
            let can_flush = flush && self.input_off == self.input.len();
            progress = match self.func {
                CompressionFunction::Stored => self.deflate_stored(can_flush, finish),
                CompressionFunction::Fast => self.deflate_fast(can_flush, finish),
                CompressionFunction::Slow => self.deflate_slow(can_flush, finish),
            };
            if !(self.huffman.pending_is_flushed() && progress) {
                break;
            }
        }
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_engine(engine: &mut DeflaterEngine, input: &[u8]) -> Vec<u8> {
        engine.set_input(input).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let more = engine.deflate(true, true);
            loop {
                let n = engine.pending().flush(&mut buf);
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n]);
            }
            if !more {
                break;
            }
        }
        engine.pending().align_to_byte();
        loop {
            let n = engine.pending().flush(&mut buf);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn test_engine_produces_output() {
        for level in [1, 6, 9] {
            let mut engine = DeflaterEngine::new(level);
            let input = b"abcabcabcabcabcabc";
            let out = run_engine(&mut engine, input);
            assert!(!out.is_empty(), "level {} produced nothing", level);
        }
    }

    #[test]
    fn test_repetitive_input_compresses() {
        let mut engine = DeflaterEngine::new(6);
        let input = vec![b'A'; 10_000];
        let out = run_engine(&mut engine, &input);
        assert!(
            out.len() < 200,
            "repetitive run compressed to {} bytes",
            out.len()
        );
    }

    #[test]
    fn test_adler_tracks_consumed_input() {
        let mut engine = DeflaterEngine::new(6);
        let input = b"checksum me";
        let _ = run_engine(&mut engine, input);
        assert_eq!(engine.adler(), Adler32::compute(input));
    }

    #[test]
    fn test_set_input_while_pending_fails() {
        let mut engine = DeflaterEngine::new(0);
        // Larger than the window so one deflate pass cannot consume it.
        engine.set_input(&vec![7u8; 3 * WSIZE]).unwrap();
        engine.deflate(false, false);
        assert!(!engine.needs_input());
        assert!(engine.set_input(b"more").is_err());
    }

    #[test]
    fn test_reset_produces_identical_output() {
        let input: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 251) as u8).collect();

        let mut engine = DeflaterEngine::new(6);
        let first = run_engine(&mut engine, &input);
        engine.reset();
        let second = run_engine(&mut engine, &input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_level_tunables() {
        // Spot-check the table against the canonical parameter set.
        assert_eq!(CONFIG_TABLE[1].max_chain, 4);
        assert_eq!(CONFIG_TABLE[6].max_lazy, 16);
        assert_eq!(CONFIG_TABLE[9].nice_length, 258);
        assert_eq!(CONFIG_TABLE[9].max_chain, 4096);
        assert!(matches!(CONFIG_TABLE[0].func, CompressionFunction::Stored));
        assert!(matches!(CONFIG_TABLE[3].func, CompressionFunction::Fast));
        assert!(matches!(CONFIG_TABLE[4].func, CompressionFunction::Slow));
    }
}
