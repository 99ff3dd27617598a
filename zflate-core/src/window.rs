//! Sliding window ring shared by the inflate and deflate engines.
//!
//! The ring keeps the most recent `capacity` bytes written to it. Bytes are
//! tracked by their absolute stream position; everything written but not yet
//! released through [`Window::drain`] or [`Window::mark_read`] is *unread*
//! and is never overwritten, so writes are bounded by [`Window::free`].
//!
//! - Inflate writes decoded bytes (literals, back-reference copies, stored
//!   data) and drains them into the caller's output as space allows; the
//!   drained bytes remain available as history for later back-references.
//! - Deflate writes input bytes, walks them with [`Window::get`] while
//!   searching for matches, and releases them with [`Window::mark_read`] as
//!   its scan position advances.

use crate::error::{Result, ZflateError};

/// A power-of-two byte ring with absolute positions.
#[derive(Debug, Clone)]
pub struct Window {
    buffer: Vec<u8>,
    mask: usize,
    /// Absolute position of the next byte to write.
    total: u64,
    /// Absolute position of the first unread byte.
    read: u64,
    /// Bytes of valid history (saturates at capacity).
    filled: usize,
}

impl Window {
    /// Create a ring of `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of 2.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Window capacity must be a power of 2, got {}",
            capacity
        );
        Self {
            buffer: vec![0; capacity],
            mask: capacity - 1,
            total: 0,
            read: 0,
            filled: 0,
        }
    }

    /// Create a ring of `2^bits` bytes.
    pub fn with_bits(bits: u8) -> Self {
        Self::new(1usize << bits)
    }

    /// Ring size in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes of history a back-reference may reach.
    pub fn history_len(&self) -> usize {
        self.filled
    }

    /// Absolute position of the next byte to be written.
    pub fn total_written(&self) -> u64 {
        self.total
    }

    /// Absolute position of the first unread byte.
    pub fn read_position(&self) -> u64 {
        self.read
    }

    /// Bytes written but not yet released.
    pub fn unread(&self) -> usize {
        (self.total - self.read) as usize
    }

    /// Bytes that can be written without overwriting unread data.
    pub fn free(&self) -> usize {
        self.capacity() - self.unread()
    }

    /// Forget all content.
    pub fn reset(&mut self) {
        self.total = 0;
        self.read = 0;
        self.filled = 0;
    }

    #[inline]
    fn advance_write(&mut self, n: usize) {
        self.total += n as u64;
        self.filled = (self.filled + n).min(self.capacity());
    }

    /// Write one byte. The caller must have checked [`Window::free`].
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        debug_assert!(self.free() > 0);
        let index = self.total as usize & self.mask;
        self.buffer[index] = byte;
        self.advance_write(1);
    }

    /// Write as much of `data` as fits; returns the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.free());
        let mut written = 0;
        while written < n {
            let start = (self.total as usize + written) & self.mask;
            let run = (n - written).min(self.capacity() - start);
            self.buffer[start..start + run].copy_from_slice(&data[written..written + run]);
            written += run;
        }
        self.advance_write(n);
        n
    }

    /// Copy up to `length` bytes starting `distance` bytes back.
    ///
    /// Overlapping copies (`length > distance`) repeat the pattern, as LZ77
    /// requires. Stops early when the ring has no free space; returns the
    /// number of bytes copied.
    pub fn copy_match(&mut self, distance: usize, length: usize) -> Result<usize> {
        if distance == 0 || distance > self.filled {
            return Err(ZflateError::invalid_distance(distance, self.filled));
        }
        let n = length.min(self.free());
        let mut src = (self.total as usize).wrapping_sub(distance) & self.mask;
        let mut dst = self.total as usize & self.mask;
        for _ in 0..n {
            self.buffer[dst] = self.buffer[src];
            src = (src + 1) & self.mask;
            dst = (dst + 1) & self.mask;
        }
        self.advance_write(n);
        Ok(n)
    }

    /// Move unread bytes into `out`, returning how many were copied.
    ///
    /// Drained bytes stay in the ring as history.
    pub fn drain(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.unread());
        let mut copied = 0;
        while copied < n {
            let start = (self.read as usize + copied) & self.mask;
            let run = (n - copied).min(self.capacity() - start);
            out[copied..copied + run].copy_from_slice(&self.buffer[start..start + run]);
            copied += run;
        }
        self.read += n as u64;
        n
    }

    /// Release `n` unread bytes without copying them anywhere.
    pub fn mark_read(&mut self, n: usize) {
        debug_assert!(n <= self.unread());
        self.read += n as u64;
    }

    /// Byte at absolute position `pos`, which must lie within the last
    /// `capacity` bytes written.
    #[inline]
    pub fn get(&self, pos: u64) -> u8 {
        debug_assert!(pos < self.total && self.total - pos <= self.capacity() as u64);
        self.buffer[pos as usize & self.mask]
    }

    /// Byte `distance` positions behind the write position.
    pub fn byte_back(&self, distance: usize) -> Result<u8> {
        if distance == 0 || distance > self.filled {
            return Err(ZflateError::invalid_distance(distance, self.filled));
        }
        Ok(self.get(self.total - distance as u64))
    }

    /// Load a preset dictionary as already-read history.
    ///
    /// Only the last `capacity` bytes of a longer dictionary are kept.
    pub fn preload(&mut self, dictionary: &[u8]) {
        let tail = &dictionary[dictionary.len().saturating_sub(self.capacity())..];
        debug_assert_eq!(self.unread(), 0);
        self.write(tail);
        self.read = self.total;
    }
}
