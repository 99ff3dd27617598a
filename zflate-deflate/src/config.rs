//! Session configuration for the inflate and deflate engines.

use zflate_core::error::{Result, ZflateError};
use zflate_core::types::{CompressionLevel, Status, WindowBits, Wrapper};

/// Inflate session parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateConfig {
    /// Largest window (log2) the stream may declare, 8-15.
    pub window_bits: u8,
    /// Framing of the compressed stream.
    pub wrapper: Wrapper,
}

impl InflateConfig {
    /// Standard zlib stream with a 32 KiB window.
    pub const ZLIB: Self = Self {
        window_bits: WindowBits::MAX,
        wrapper: Wrapper::Zlib,
    };

    /// Raw DEFLATE data with a 32 KiB window.
    pub const RAW: Self = Self {
        window_bits: WindowBits::MAX,
        wrapper: Wrapper::Raw,
    };

    /// Create a configuration from a zlib-style window bits value; negative
    /// values select raw DEFLATE.
    pub fn from_raw(window_bits: i32) -> Result<Self> {
        let bits = WindowBits::from_raw(window_bits)
            .ok_or_else(|| invalid(format!("window bits {} out of range", window_bits)))?;
        Ok(Self {
            window_bits: bits.bits(),
            wrapper: bits.wrapper(),
        })
    }

    /// Set the window size.
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Set the framing.
    pub fn with_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Check the parameters and return the engine's window setting.
    pub fn validate(&self) -> Result<WindowBits> {
        WindowBits::new(self.window_bits, self.wrapper)
            .ok_or_else(|| invalid(format!("window bits {} out of range", self.window_bits)))
    }
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self::ZLIB
    }
}

/// Deflate session parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateConfig {
    /// Compression level, -1 (default) to 9.
    pub level: i32,
    /// Window size (log2), 8-15.
    pub window_bits: u8,
    /// Framing of the compressed stream.
    pub wrapper: Wrapper,
}

impl DeflateConfig {
    /// Default level, 32 KiB window, zlib framing.
    pub const ZLIB: Self = Self {
        level: -1,
        window_bits: WindowBits::MAX,
        wrapper: Wrapper::Zlib,
    };

    /// Create a configuration for `level` with the default window.
    pub fn new(level: i32) -> Self {
        Self { level, ..Self::ZLIB }
    }

    /// Set the compression level.
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Set the window size.
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Set the framing.
    pub fn with_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Check the parameters and return the engine settings.
    pub fn validate(&self) -> Result<(CompressionLevel, WindowBits)> {
        let level = CompressionLevel::checked(self.level)
            .ok_or_else(|| invalid(format!("compression level {} out of range", self.level)))?;
        let bits = WindowBits::new(self.window_bits, self.wrapper)
            .ok_or_else(|| invalid(format!("window bits {} out of range", self.window_bits)))?;
        Ok((level, bits))
    }
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self::ZLIB
    }
}

fn invalid(message: String) -> ZflateError {
    ZflateError::stream(Status::StreamError, message)
}
