//! Output window for DEFLATE decompression.
//!
//! A 32 KiB ring buffer holding the most recently decompressed bytes.
//! Back-references (length, distance) are resolved against this history,
//! and the caller drains decoded bytes through
//! [`OutputWindow::copy_output`]. Decoding stalls when the window is
//! full of undrained output, which bounds memory regardless of the
//! stream's expansion ratio.

use crate::bitstream::BitInput;
use crate::error::{FlateError, Result};

/// Window size mandated by DEFLATE (32 KiB).
pub const WINDOW_SIZE: usize = 1 << 15;

const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// Ring buffer of decompressed history with an output drain cursor.
#[derive(Debug)]
pub struct OutputWindow {
    /// The ring buffer.
    window: Vec<u8>,
    /// Next write position.
    window_end: usize,
    /// Bytes written but not yet drained by the caller.
    window_filled: usize,
    /// Valid history for back-references, capped at the window size.
    /// Includes preset dictionary bytes, which are never drained.
    history: usize,
}

impl OutputWindow {
    /// Create an empty output window.
    pub fn new() -> Self {
        Self {
            window: vec![0; WINDOW_SIZE],
            window_end: 0,
            window_filled: 0,
            history: 0,
        }
    }

    /// Append a single decoded byte.
    pub fn write(&mut self, value: u8) -> Result<()> {
        if self.window_filled == WINDOW_SIZE {
            return Err(FlateError::invalid_state("output window is full"));
        }
        self.window_filled += 1;
        self.window[self.window_end] = value;
        self.window_end = (self.window_end + 1) & WINDOW_MASK;
        if self.history < WINDOW_SIZE {
            self.history += 1;
        }
        Ok(())
    }

    /// Expand a back-reference: copy `length` bytes starting `distance`
    /// bytes behind the write position. `length` may exceed `distance`,
    /// producing a repeating pattern.
    pub fn repeat(&mut self, length: usize, distance: usize) -> Result<()> {
        if distance == 0 || distance > self.history {
            return Err(FlateError::invalid_distance(distance, self.history));
        }
        if self.window_filled + length > WINDOW_SIZE {
            return Err(FlateError::invalid_state("output window is full"));
        }
        self.window_filled += length;
        self.history = (self.history + length).min(WINDOW_SIZE);

        let mut src = (self.window_end.wrapping_sub(distance)) & WINDOW_MASK;
        for _ in 0..length {
            self.window[self.window_end] = self.window[src];
            self.window_end = (self.window_end + 1) & WINDOW_MASK;
            src = (src + 1) & WINDOW_MASK;
        }
        Ok(())
    }

    /// Copy up to `length` bytes of a stored block from `input` into the
    /// window. Returns how many bytes were actually copied, limited by
    /// free window space and available input.
    pub fn copy_stored(&mut self, input: &mut BitInput, length: usize) -> Result<usize> {
        let length = length.min(WINDOW_SIZE - self.window_filled);
        if length == 0 {
            return Ok(0);
        }

        let tail_len = WINDOW_SIZE - self.window_end;
        let copied = if length > tail_len {
            let head = self.window_end;
            let mut copied = input.copy_bytes(&mut self.window[head..head + tail_len])?;
            if copied == tail_len {
                copied += input.copy_bytes(&mut self.window[..length - tail_len])?;
            }
            copied
        } else {
            let head = self.window_end;
            input.copy_bytes(&mut self.window[head..head + length])?
        };

        self.window_end = (self.window_end + copied) & WINDOW_MASK;
        self.window_filled += copied;
        self.history = (self.history + copied).min(WINDOW_SIZE);
        Ok(copied)
    }

    /// Preload the window with a preset dictionary. Dictionary bytes
    /// become back-reference history but are not part of the output.
    pub fn copy_dict(&mut self, dictionary: &[u8]) {
        // Only the last window-full of a long dictionary is reachable.
        let dict = if dictionary.len() > WINDOW_SIZE {
            &dictionary[dictionary.len() - WINDOW_SIZE..]
        } else {
            dictionary
        };

        for &byte in dict {
            self.window[self.window_end] = byte;
            self.window_end = (self.window_end + 1) & WINDOW_MASK;
        }
        self.history = (self.history + dict.len()).min(WINDOW_SIZE);
    }

    /// Number of undrained decoded bytes.
    pub fn available(&self) -> usize {
        self.window_filled
    }

    /// Free space for further decoding before the caller must drain.
    pub fn free_space(&self) -> usize {
        WINDOW_SIZE - self.window_filled
    }

    /// Drain decoded bytes into `output`, returning how many were copied.
    pub fn copy_output(&mut self, output: &mut [u8]) -> usize {
        let mut len = output.len();
        let mut copy_end = self.window_end;
        if len > self.window_filled {
            len = self.window_filled;
        } else {
            copy_end = (self.window_end + len).wrapping_sub(self.window_filled) & WINDOW_MASK;
        }

        let copied = len;
        let tail_len = len.saturating_sub(copy_end);
        if tail_len > 0 {
            output[..tail_len].copy_from_slice(&self.window[WINDOW_SIZE - tail_len..]);
            len = copy_end;
        }
        output[tail_len..tail_len + len].copy_from_slice(&self.window[copy_end - len..copy_end]);
        self.window_filled -= copied;
        copied
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.window_end = 0;
        self.window_filled = 0;
        self.history = 0;
    }
}

impl Default for OutputWindow {
    fn default() -> Self {
        Self::new()
    }
}
