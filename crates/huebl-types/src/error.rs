//! Error types for payload decoding in huebl-types.

use thiserror::Error;

/// Errors that can occur when decoding characteristic payloads or
/// light commands.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in huebl-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Payload length does not match the characteristic's fixed layout.
    #[error("{field} payload requires {expected} bytes, got {actual}")]
    InvalidLength {
        /// Which characteristic was being decoded.
        field: &'static str,
        /// Expected payload size.
        expected: usize,
        /// Actual payload size received.
        actual: usize,
    },

    /// String characteristic contained a non-ASCII byte.
    #[error("{field} payload is not ASCII (byte 0x{byte:02X} at offset {offset})")]
    NotAscii {
        /// Which characteristic was being decoded.
        field: &'static str,
        /// The offending byte.
        byte: u8,
        /// Offset of the offending byte.
        offset: usize,
    },
}

impl ParseError {
    /// Create a length mismatch error.
    pub fn invalid_length(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            field,
            expected,
            actual,
        }
    }
}

/// Result type alias using huebl-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
