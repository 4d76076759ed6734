//! Error types for ferroflate operations.
//!
//! Failures fall into two families. *Format* errors mean the compressed
//! stream itself is damaged (bad header check, impossible Huffman code,
//! mismatched checksum); the stream cannot be resumed and must be
//! abandoned by the caller. *State* errors mean the caller drove the API
//! out of order (feeding input before the previous buffer was consumed,
//! setting a dictionary at the wrong time); no stream state is mutated.
//!
//! Running out of input or output space is deliberately *not* an error:
//! the codecs report it through `needs_input()` and zero-byte returns so
//! the caller can supply more and retry the same operation.

use thiserror::Error;

/// The main error type for ferroflate operations.
#[derive(Debug, Error)]
pub enum FlateError {
    /// Invalid stream or block header.
    #[error("invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Corrupted compressed data.
    #[error("corrupted data at bit {bit_position}: {message}")]
    CorruptedData {
        /// Bit offset into the compressed stream where corruption was detected.
        bit_position: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid Huffman code encountered during decompression.
    #[error("invalid Huffman code at bit {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// Checksum mismatch between stream trailer and computed value.
    #[error("checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Expected checksum value from the stream.
        expected: u32,
        /// Computed checksum value from the data.
        computed: u32,
    },

    /// Back-reference distance exceeds the available history.
    #[error("invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Current history size.
        history_size: usize,
    },

    /// The API was driven out of order by the caller.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the misuse.
        message: String,
    },
}

/// Result type alias for ferroflate operations.
pub type Result<T> = std::result::Result<T, FlateError>;

impl FlateError {
    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(bit_position: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            bit_position,
            message: message.into(),
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// True for errors that indicate a damaged stream rather than API misuse.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Self::InvalidState { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlateError::checksum_mismatch(0x12345678, 0xDEADBEEF);
        assert!(err.to_string().contains("checksum mismatch"));

        let err = FlateError::invalid_header("header checksum illegal");
        assert!(err.to_string().contains("header checksum illegal"));

        let err = FlateError::invalid_distance(300, 200);
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn test_error_classification() {
        assert!(FlateError::invalid_huffman(17).is_format_error());
        assert!(FlateError::checksum_mismatch(1, 2).is_format_error());
        assert!(!FlateError::invalid_state("finish() already called").is_format_error());
    }
}
