//! Stream context: buffer bookkeeping around one attached engine.
//!
//! A [`ZStream`] owns at most one engine at a time, selected through
//! [`Active`]. Buffers are borrowed per call; after each call the context
//! reports how much of them was used:
//!
//! - `next_in` / `avail_in`: bytes consumed from and left in the input slice
//! - `next_out` / `avail_out`: bytes written to and space left in the output slice
//! - `total_in` / `total_out`: running totals since the engine was attached
//!
//! ```rust
//! use zflate_core::{Flush, Status};
//! use zflate_deflate::stream::{Direction, ZStream};
//!
//! let mut deflater = ZStream::init(Direction::Deflate).unwrap();
//! let mut compressed = [0u8; 64];
//! let status = deflater.process(b"hello hello hello", &mut compressed, Flush::Finish);
//! assert_eq!(status, Status::StreamEnd);
//! let len = deflater.next_out();
//!
//! let mut inflater = ZStream::init(Direction::Inflate).unwrap();
//! let mut plain = [0u8; 64];
//! let status = inflater.process(&compressed[..len], &mut plain, Flush::NoFlush);
//! assert_eq!(status, Status::StreamEnd);
//! assert_eq!(&plain[..inflater.next_out()], b"hello hello hello");
//! ```

use crate::config::{DeflateConfig, InflateConfig};
use crate::deflate::DeflateState;
use crate::inflate::InflateState;
use zflate_core::bitstream::{InputCursor, OutputCursor};
use zflate_core::error::Result;
use zflate_core::types::{CompressionLevel, Flush, Status, WindowBits};

/// Which engine [`ZStream::init`] attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Decompression with a 32 KiB window and zlib framing.
    Inflate,
    /// Compression at the default level with a 32 KiB window and zlib framing.
    Deflate,
}

/// The engine attached to a stream.
#[derive(Debug, Default)]
pub enum Active {
    /// Nothing attached.
    #[default]
    None,
    /// Decompression engine.
    Inflate(Box<InflateState>),
    /// Compression engine.
    Deflate(Box<DeflateState>),
}

/// Caller-facing stream context.
#[derive(Debug)]
pub struct ZStream {
    next_in: usize,
    avail_in: usize,
    total_in: u64,
    next_out: usize,
    avail_out: usize,
    total_out: u64,
    message: Option<&'static str>,
    adler: u32,
    active: Active,
}

impl Default for ZStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ZStream {
    /// Create a context with no engine attached.
    pub fn new() -> Self {
        Self {
            next_in: 0,
            avail_in: 0,
            total_in: 0,
            next_out: 0,
            avail_out: 0,
            total_out: 0,
            message: None,
            adler: 1,
            active: Active::None,
        }
    }

    /// Create a context with an engine attached using default parameters.
    pub fn init(direction: Direction) -> Result<Self> {
        let mut stream = Self::new();
        let status = match direction {
            Direction::Inflate => stream.inflate_init_with(&InflateConfig::default()),
            Direction::Deflate => stream.deflate_init_with(&DeflateConfig::default()),
        };
        status.into_result(stream.message)?;
        Ok(stream)
    }

    /// Offset of the first unconsumed byte of the last input slice.
    pub fn next_in(&self) -> usize {
        self.next_in
    }

    /// Bytes of the last input slice left unconsumed.
    pub fn avail_in(&self) -> usize {
        self.avail_in
    }

    /// Bytes consumed since the engine was attached.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Bytes written into the last output slice.
    pub fn next_out(&self) -> usize {
        self.next_out
    }

    /// Space left in the last output slice.
    pub fn avail_out(&self) -> usize {
        self.avail_out
    }

    /// Bytes produced since the engine was attached.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Diagnostic of the last failure.
    pub fn message(&self) -> Option<&'static str> {
        self.message
    }

    /// Running Adler-32, or the dictionary id while one is awaited.
    pub fn adler(&self) -> u32 {
        self.adler
    }

    /// The attached engine.
    pub fn active(&self) -> &Active {
        &self.active
    }

    /// True when an engine is attached.
    pub fn is_attached(&self) -> bool {
        !matches!(self.active, Active::None)
    }

    fn usage_error(&mut self, message: &'static str) -> Status {
        tracing::debug!(message, "stream usage error");
        self.message = Some(message);
        Status::StreamError
    }

    fn attach(&mut self, active: Active) -> Status {
        if self.is_attached() {
            return self.usage_error("stream already has an engine attached");
        }
        self.active = active;
        self.clear_counters();
        Status::Ok
    }

    fn clear_counters(&mut self) {
        self.next_in = 0;
        self.avail_in = 0;
        self.total_in = 0;
        self.next_out = 0;
        self.avail_out = 0;
        self.total_out = 0;
        self.message = None;
        self.adler = 1;
    }

    /// Attach an inflate engine. `window_bits` 8..=15 expects a zlib stream,
    /// -15..=-8 raw DEFLATE.
    pub fn inflate_init(&mut self, window_bits: i32) -> Status {
        match WindowBits::from_raw(window_bits) {
            Some(bits) => self.attach_inflate(bits),
            None => self.usage_error("invalid window bits"),
        }
    }

    /// Attach an inflate engine from a configuration.
    pub fn inflate_init_with(&mut self, config: &InflateConfig) -> Status {
        match config.validate() {
            Ok(bits) => self.attach_inflate(bits),
            Err(_) => self.usage_error("invalid window bits"),
        }
    }

    fn attach_inflate(&mut self, bits: WindowBits) -> Status {
        let status = self.attach(Active::Inflate(Box::new(InflateState::new(bits))));
        if status == Status::Ok {
            tracing::debug!(window_bits = bits.to_raw(), "inflate engine attached");
        }
        status
    }

    /// Attach a deflate engine with a 32 KiB window.
    pub fn deflate_init(&mut self, level: i32) -> Status {
        self.deflate_init2(level, i32::from(WindowBits::MAX))
    }

    /// Attach a deflate engine. Negative `window_bits` produce raw DEFLATE.
    pub fn deflate_init2(&mut self, level: i32, window_bits: i32) -> Status {
        let Some(level) = CompressionLevel::checked(level) else {
            return self.usage_error("invalid compression level");
        };
        match WindowBits::from_raw(window_bits) {
            Some(bits) => self.attach_deflate(level, bits),
            None => self.usage_error("invalid window bits"),
        }
    }

    /// Attach a deflate engine from a configuration.
    pub fn deflate_init_with(&mut self, config: &DeflateConfig) -> Status {
        match config.validate() {
            Ok((level, bits)) => self.attach_deflate(level, bits),
            Err(_) => self.usage_error("invalid deflate parameters"),
        }
    }

    fn attach_deflate(&mut self, level: CompressionLevel, bits: WindowBits) -> Status {
        let state = DeflateState::new(level, bits);
        let status = self.attach(Active::Deflate(Box::new(state)));
        if status == Status::Ok {
            tracing::debug!(%level, window_bits = bits.to_raw(), "deflate engine attached");
        }
        status
    }

    fn record(&mut self, input: &InputCursor<'_>, output: &OutputCursor<'_>) {
        self.next_in = input.position();
        self.avail_in = input.remaining();
        self.total_in += input.position() as u64;
        self.next_out = output.position();
        self.avail_out = output.remaining();
        self.total_out += output.position() as u64;
    }

    /// Run the inflate engine over `input`, writing into `output`.
    pub fn inflate(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Status {
        let Active::Inflate(state) = &mut self.active else {
            return self.usage_error("no inflate engine attached");
        };
        let mut input = InputCursor::new(input);
        let mut output = OutputCursor::new(output);
        let status = state.inflate(&mut input, &mut output, flush);
        let adler = state.check_value();
        let message = state.message();

        self.record(&input, &output);
        self.adler = adler;
        if status.is_error() && message.is_some() {
            self.message = message;
        }
        status
    }

    /// Run the deflate engine over `input`, writing into `output`.
    pub fn deflate(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Status {
        let Active::Deflate(state) = &mut self.active else {
            return self.usage_error("no deflate engine attached");
        };
        let mut input = InputCursor::new(input);
        let mut output = OutputCursor::new(output);
        let status = state.deflate(&mut input, &mut output, flush);
        let adler = state.check_value();
        let message = state.message();

        self.record(&input, &output);
        self.adler = adler;
        if status.is_error() && message.is_some() {
            self.message = message;
        }
        status
    }

    /// Run whichever engine is attached.
    pub fn process(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Status {
        match self.active {
            Active::Inflate(_) => self.inflate(input, output, flush),
            Active::Deflate(_) => self.deflate(input, output, flush),
            Active::None => self.usage_error("no engine attached"),
        }
    }

    /// Supply the preset dictionary an inflate stream asked for.
    pub fn inflate_set_dictionary(&mut self, dictionary: &[u8]) -> Status {
        let Active::Inflate(state) = &mut self.active else {
            return self.usage_error("no inflate engine attached");
        };
        let status = state.set_dictionary(dictionary);
        let message = state.message();
        if status != Status::Ok {
            self.message = message;
        }
        status
    }

    /// Preload a dictionary before compressing.
    pub fn deflate_set_dictionary(&mut self, dictionary: &[u8]) -> Status {
        let Active::Deflate(state) = &mut self.active else {
            return self.usage_error("no deflate engine attached");
        };
        let status = state.set_dictionary(dictionary);
        let adler = state.check_value();
        let message = state.message();
        if status == Status::Ok {
            self.adler = adler;
        } else {
            self.message = message;
        }
        status
    }

    /// Restart the inflate engine on a new stream.
    pub fn inflate_reset(&mut self) -> Status {
        let Active::Inflate(state) = &mut self.active else {
            return self.usage_error("no inflate engine attached");
        };
        state.reset();
        self.clear_counters();
        Status::Ok
    }

    /// Restart the deflate engine on a new stream.
    pub fn deflate_reset(&mut self) -> Status {
        let Active::Deflate(state) = &mut self.active else {
            return self.usage_error("no deflate engine attached");
        };
        state.reset();
        self.clear_counters();
        Status::Ok
    }

    /// Detach the inflate engine.
    pub fn inflate_end(&mut self) -> Status {
        if !matches!(self.active, Active::Inflate(_)) {
            return self.usage_error("no inflate engine attached");
        }
        self.end()
    }

    /// Detach the deflate engine.
    pub fn deflate_end(&mut self) -> Status {
        if !matches!(self.active, Active::Deflate(_)) {
            return self.usage_error("no deflate engine attached");
        }
        self.end()
    }

    /// Detach whichever engine is attached.
    pub fn end(&mut self) -> Status {
        match std::mem::take(&mut self.active) {
            Active::None => self.usage_error("no engine attached"),
            Active::Inflate(_) => {
                tracing::debug!(
                    total_in = self.total_in,
                    total_out = self.total_out,
                    "inflate engine detached"
                );
                Status::Ok
            }
            Active::Deflate(_) => {
                tracing::debug!(
                    total_in = self.total_in,
                    total_out = self.total_out,
                    "deflate engine detached"
                );
                Status::Ok
            }
        }
    }
}
