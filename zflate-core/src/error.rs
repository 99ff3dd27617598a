//! Error types for zflate operations.
//!
//! The engines themselves report [`Status`] codes (the zlib contract); this
//! error type is what the higher layers (one-shot helpers, stream adapters,
//! CLI) surface once a status has been judged fatal.

use crate::types::Status;
use std::io;
use thiserror::Error;

/// The main error type for zflate operations.
#[derive(Debug, Error)]
pub enum ZflateError {
    /// I/O error from an underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed zlib header.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Adler-32 mismatch between trailer and decoded data.
    #[error("Adler-32 mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the stream.
        expected: u32,
        /// Checksum computed over the decoded data.
        computed: u32,
    },

    /// Corrupted compressed data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Input offset at which the corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Code lengths that do not form a usable prefix code.
    #[error("Invalid Huffman code: {message}")]
    InvalidHuffmanCode {
        /// Description of the problem.
        message: String,
    },

    /// Back-reference pointing before the start of the history.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Bytes of history available.
        history_size: usize,
    },

    /// The stream was compressed with a preset dictionary that was not supplied.
    #[error("Preset dictionary required (id {id:#010x})")]
    NeedDictionary {
        /// Adler-32 of the dictionary expected by the stream.
        id: u32,
    },

    /// An engine call ended with an error status.
    #[error("{status}: {message}")]
    Stream {
        /// Status returned by the engine.
        status: Status,
        /// Diagnostic message recorded on the stream.
        message: String,
    },

    /// Input ended before the stream was complete.
    #[error("Unexpected end of stream after {consumed} bytes")]
    UnexpectedEof {
        /// Number of input bytes consumed before the stream ran dry.
        consumed: u64,
    },
}

/// Result type alias for zflate operations.
pub type Result<T> = std::result::Result<T, ZflateError>;

impl ZflateError {
    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(message: impl Into<String>) -> Self {
        Self::InvalidHuffmanCode {
            message: message.into(),
        }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create a stream status error.
    pub fn stream(status: Status, message: impl Into<String>) -> Self {
        Self::Stream {
            status,
            message: message.into(),
        }
    }

    /// Create an unexpected end-of-stream error.
    pub fn unexpected_eof(consumed: u64) -> Self {
        Self::UnexpectedEof { consumed }
    }

    /// Status code that best describes this error.
    pub fn status(&self) -> Status {
        match self {
            Self::Io(_) => Status::ErrNo,
            Self::NeedDictionary { .. } => Status::NeedDict,
            Self::Stream { status, .. } => *status,
            Self::UnexpectedEof { .. } => Status::BufError,
            Self::InvalidHeader { .. }
            | Self::ChecksumMismatch { .. }
            | Self::CorruptedData { .. }
            | Self::InvalidHuffmanCode { .. }
            | Self::InvalidDistance { .. } => Status::DataError,
        }
    }
}

impl From<ZflateError> for io::Error {
    fn from(err: ZflateError) -> Self {
        match err {
            ZflateError::Io(e) => e,
            eof @ ZflateError::UnexpectedEof { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, eof)
            }
            usage @ ZflateError::Stream {
                status: Status::StreamError | Status::VersionError | Status::MemError,
                ..
            } => io::Error::other(usage),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
