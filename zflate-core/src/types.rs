//! Status codes, flush modes and tuning parameters shared by both engines.
//!
//! The numeric values of [`Status`] and [`Flush`] follow the zlib C API so
//! that codes can be logged or compared against other implementations.

use crate::error::{Result, ZflateError};
use std::fmt;

/// Result of a single engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Progress was made; call again with more input or output space.
    Ok,
    /// The end of the compressed stream was reached.
    StreamEnd,
    /// A preset dictionary is required before decoding can continue.
    NeedDict,
    /// I/O error reported by a wrapping layer.
    ErrNo,
    /// Usage error: no engine attached, wrong engine, invalid parameter.
    StreamError,
    /// The compressed data is corrupt.
    DataError,
    /// Allocation failure.
    MemError,
    /// No progress was possible with the buffers supplied.
    BufError,
    /// Incompatible library version.
    VersionError,
}

impl Status {
    /// zlib numeric code of this status.
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::StreamEnd => 1,
            Self::NeedDict => 2,
            Self::ErrNo => -1,
            Self::StreamError => -2,
            Self::DataError => -3,
            Self::MemError => -4,
            Self::BufError => -5,
            Self::VersionError => -6,
        }
    }

    /// Look up a status by its zlib numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Ok,
            1 => Self::StreamEnd,
            2 => Self::NeedDict,
            -1 => Self::ErrNo,
            -2 => Self::StreamError,
            -3 => Self::DataError,
            -4 => Self::MemError,
            -5 => Self::BufError,
            -6 => Self::VersionError,
            _ => return None,
        })
    }

    /// True for the negative (error) codes.
    pub fn is_error(self) -> bool {
        self.code() < 0
    }

    /// Convert an error status into a [`ZflateError`] carrying `message`.
    ///
    /// Non-error statuses, `NeedDict` included, pass through unchanged.
    pub fn into_result(self, message: Option<&str>) -> Result<Self> {
        if self.is_error() {
            Err(ZflateError::stream(
                self,
                message.unwrap_or_else(|| self.description()),
            ))
        } else {
            Ok(self)
        }
    }

    /// Generic description of the status, used when the engine left no message.
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::StreamEnd => "stream end",
            Self::NeedDict => "need dictionary",
            Self::ErrNo => "file error",
            Self::StreamError => "stream error",
            Self::DataError => "data error",
            Self::MemError => "insufficient memory",
            Self::BufError => "buffer error",
            Self::VersionError => "incompatible version",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Flush strategy requested by the caller of a process call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Flush {
    /// Batch data for the best ratio.
    #[default]
    NoFlush,
    /// Legacy mode, handled exactly like [`Flush::SyncFlush`].
    PartialFlush,
    /// Emit all pending output and align to a byte boundary.
    SyncFlush,
    /// Like `SyncFlush`, and forget the match history so decoding can restart here.
    FullFlush,
    /// Complete the stream.
    Finish,
}

impl Flush {
    /// zlib numeric code of this flush mode.
    pub fn code(self) -> i32 {
        match self {
            Self::NoFlush => 0,
            Self::PartialFlush => 1,
            Self::SyncFlush => 2,
            Self::FullFlush => 3,
            Self::Finish => 4,
        }
    }

    /// Collapse the legacy partial flush onto sync flush.
    pub fn normalized(self) -> Self {
        match self {
            Self::PartialFlush => Self::SyncFlush,
            other => other,
        }
    }
}

/// Compression level (-1 = default, 0 = store only, 1 = fastest, 9 = smallest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressionLevel(i8);

impl CompressionLevel {
    /// Library default, equivalent to level 6.
    pub const DEFAULT: Self = Self(-1);
    /// Store only.
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const BEST_SPEED: Self = Self(1);
    /// Smallest output.
    pub const BEST: Self = Self(9);

    /// Create a compression level, clamping to the valid range.
    pub fn new(level: i32) -> Self {
        if level < 0 {
            Self::DEFAULT
        } else {
            Self(level.min(9) as i8)
        }
    }

    /// Create a compression level, rejecting values outside -1..=9.
    pub fn checked(level: i32) -> Option<Self> {
        (-1..=9).contains(&level).then_some(Self(level as i8))
    }

    /// The raw level as configured (may be -1).
    pub fn raw(self) -> i8 {
        self.0
    }

    /// Effective level in 0..=9.
    pub fn level(self) -> u8 {
        if self.0 < 0 { 6 } else { self.0 as u8 }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Framing around the DEFLATE payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wrapper {
    /// RFC 1950 header and Adler-32 trailer.
    #[default]
    Zlib,
    /// Bare RFC 1951 blocks.
    Raw,
}

/// Window size exponent plus framing.
///
/// Parsed from the zlib-style signed integer: 8..=15 selects a zlib stream,
/// -15..=-8 a raw stream with a window of `2^|bits|` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowBits {
    bits: u8,
    wrapper: Wrapper,
}

impl WindowBits {
    /// Smallest supported exponent (256-byte window).
    pub const MIN: u8 = 8;
    /// Largest supported exponent (32 KiB window).
    pub const MAX: u8 = 15;

    /// Create from an exponent and framing.
    pub fn new(bits: u8, wrapper: Wrapper) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&bits)
            .then_some(Self { bits, wrapper })
    }

    /// Parse the zlib-style signed window bits value.
    pub fn from_raw(raw: i32) -> Option<Self> {
        let wrapper = if raw < 0 { Wrapper::Raw } else { Wrapper::Zlib };
        let bits = u8::try_from(raw.unsigned_abs()).ok()?;
        Self::new(bits, wrapper)
    }

    /// Window size exponent.
    pub fn bits(self) -> u8 {
        self.bits
    }

    /// Framing.
    pub fn wrapper(self) -> Wrapper {
        self.wrapper
    }

    /// Window size in bytes.
    pub fn window_size(self) -> usize {
        1 << self.bits
    }

    /// Signed zlib-style representation.
    pub fn to_raw(self) -> i32 {
        match self.wrapper {
            Wrapper::Zlib => i32::from(self.bits),
            Wrapper::Raw => -i32::from(self.bits),
        }
    }
}

impl Default for WindowBits {
    fn default() -> Self {
        Self {
            bits: Self::MAX,
            wrapper: Wrapper::Zlib,
        }
    }
}
