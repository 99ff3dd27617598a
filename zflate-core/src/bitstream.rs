//! Bit-level I/O for the DEFLATE bit stream.
//!
//! The engines are driven by caller-supplied buffers that may end at any
//! byte, so the reader here never blocks and never fails on short input:
//! [`BitReader`] keeps its bit accumulator between calls and pulls bytes
//! from an [`InputCursor`] one at a time, only when a request cannot be
//! satisfied from the bits it already holds. A request that cannot be
//! completed returns `None` and leaves every bit in place, so the caller can
//! retry the same request once more input arrives.
//!
//! # Bit Ordering
//!
//! DEFLATE packs bits LSB-first within each byte; Huffman codes are stored
//! most significant bit first and are therefore bit-reversed by the writer.
//!
//! # Example
//!
//! ```
//! use zflate_core::bitstream::{BitReader, BitWriter, InputCursor};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3);
//! writer.write_bits(0b1100, 4);
//! writer.align_to_byte();
//! let bytes = writer.take_pending();
//!
//! let mut reader = BitReader::new();
//! let mut input = InputCursor::new(&bytes);
//! assert_eq!(reader.read_bits(&mut input, 3), Some(0b101));
//! assert_eq!(reader.read_bits(&mut input, 4), Some(0b1100));
//! ```

/// Read position over a caller-supplied input slice.
#[derive(Debug)]
pub struct InputCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> InputCursor<'a> {
    /// Wrap an input slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume one byte.
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Consume up to `max` bytes and return them.
    pub fn take(&mut self, max: usize) -> &'a [u8] {
        let n = max.min(self.remaining());
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        slice
    }
}

/// Write position over a caller-supplied output slice.
#[derive(Debug)]
pub struct OutputCursor<'a> {
    data: &'a mut [u8],
    pos: usize,
}

impl<'a> OutputCursor<'a> {
    /// Wrap an output slice.
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Free space left.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when no space is left.
    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Copy as much of `bytes` as fits; returns the number copied.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.data[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.pos += n;
        n
    }

    /// The unwritten tail, for callers that fill it directly.
    pub fn unfilled(&mut self) -> &mut [u8] {
        &mut self.data[self.pos..]
    }

    /// Mark `n` bytes of [`OutputCursor::unfilled`] as written.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        self.pos += n;
    }

    /// The bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.data[..self.pos]
    }
}

/// Resumable LSB-first bit reader.
///
/// Bits above `bits_available()` in the accumulator are always zero, which
/// lets table lookups peek a fixed width even when fewer bits are held.
#[derive(Debug, Clone, Default)]
pub struct BitReader {
    hold: u64,
    bits: u32,
    total_bits: u64,
}

impl BitReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits currently held.
    #[inline]
    pub fn bits_available(&self) -> u32 {
        self.bits
    }

    /// Total number of bits consumed (for diagnostics).
    pub fn bit_position(&self) -> u64 {
        self.total_bits
    }

    /// Pull one byte from `input` into the accumulator.
    #[inline]
    pub fn pull_byte(&mut self, input: &mut InputCursor<'_>) -> bool {
        debug_assert!(self.bits <= 56);
        match input.next_byte() {
            Some(byte) => {
                self.hold |= u64::from(byte) << self.bits;
                self.bits += 8;
                true
            }
            None => false,
        }
    }

    /// Make sure at least `count` bits are held, pulling bytes as needed.
    #[inline]
    pub fn need(&mut self, input: &mut InputCursor<'_>, count: u32) -> bool {
        while self.bits < count {
            if !self.pull_byte(input) {
                return false;
            }
        }
        true
    }

    /// The low `count` held bits, without consuming them.
    #[inline]
    pub fn peek(&self, count: u32) -> u32 {
        debug_assert!(count <= 32);
        (self.hold & ((1u64 << count) - 1)) as u32
    }

    /// The whole accumulator, for decoders that walk codes bit by bit.
    #[inline]
    pub fn hold(&self) -> u64 {
        self.hold
    }

    /// Drop `count` held bits.
    #[inline]
    pub fn consume(&mut self, count: u32) {
        debug_assert!(count <= self.bits);
        self.hold >>= count;
        self.bits -= count;
        self.total_bits += u64::from(count);
    }

    /// Read `count` (0-32) bits, or `None` if the input ran out first.
    #[inline]
    pub fn read_bits(&mut self, input: &mut InputCursor<'_>, count: u32) -> Option<u32> {
        if !self.need(input, count) {
            return None;
        }
        let value = self.peek(count);
        self.consume(count);
        Some(value)
    }

    /// Discard bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        let partial = self.bits % 8;
        self.consume(partial);
    }

    /// Forget all held bits.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// LSB-first bit writer that accumulates into an owned pending buffer.
///
/// Complete bytes move into the pending buffer as soon as they are formed;
/// the final partial byte stays in the accumulator until more bits arrive or
/// [`BitWriter::align_to_byte`] pads it with zeros.
#[derive(Debug, Default)]
pub struct BitWriter {
    pending: Vec<u8>,
    drained: usize,
    buffer: u64,
    bits_in_buffer: u32,
    total_bits: u64,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bits written.
    pub fn bits_written(&self) -> u64 {
        self.total_bits
    }

    /// Bits waiting in the accumulator (always below 8 between calls).
    pub fn partial_bits(&self) -> u32 {
        self.bits_in_buffer
    }

    #[inline]
    fn flush_bytes(&mut self) {
        while self.bits_in_buffer >= 8 {
            self.pending.push(self.buffer as u8);
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
    }

    /// Write the low `count` (0-32) bits of `value`.
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 32);
        if count == 0 {
            return;
        }
        let mask = (1u64 << count) - 1;
        self.buffer |= (u64::from(value) & mask) << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits += u64::from(count);
        self.flush_bytes();
    }

    /// Pad the partial byte with zero bits.
    pub fn align_to_byte(&mut self) {
        let pad = (8 - self.bits_in_buffer % 8) % 8;
        self.write_bits(0, pad);
    }

    /// Append whole bytes; the writer must be byte-aligned.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bits_in_buffer, 0);
        self.pending.extend_from_slice(bytes);
        self.total_bits += bytes.len() as u64 * 8;
    }

    /// Complete bytes not yet drained.
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.drained
    }

    /// True when nothing is waiting to be drained.
    pub fn is_drained(&self) -> bool {
        self.pending_len() == 0
    }

    /// Move as many pending bytes as fit into `output`.
    pub fn drain_into(&mut self, output: &mut OutputCursor<'_>) -> usize {
        let n = output.write(&self.pending[self.drained..]);
        self.drained += n;
        if self.drained == self.pending.len() {
            self.pending.clear();
            self.drained = 0;
        }
        n
    }

    /// Take all pending bytes at once.
    pub fn take_pending(&mut self) -> Vec<u8> {
        let rest = self.pending.split_off(self.drained);
        self.pending.clear();
        self.drained = 0;
        rest
    }

    /// Drop pending bytes and accumulated bits.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.total_bits = 0;
        self.drained = 0;
        self.buffer = 0;
        self.bits_in_buffer = 0;
    }
}
