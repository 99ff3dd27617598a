//! # zflate Core
//!
//! Core components shared by the zflate inflate and deflate engines.
//!
//! - [`adler32`]: Adler-32 checksum used by the zlib trailer
//! - [`bitstream`]: resumable LSB-first bit reader, bit writer and byte cursors
//! - [`window`]: power-of-two sliding window ring used by both directions
//! - [`types`]: status codes, flush modes, compression levels and window bits
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Tooling                                             │
//! │     zflate CLI, io::Write adapters, one-shot helpers    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     ZStream context, Inflate / Deflate engines          │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate)                             │
//! │     BitReader/BitWriter, Window, Adler-32, Status       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use zflate_core::adler32::{Adler32, adler32};
//! use zflate_core::bitstream::{BitReader, InputCursor};
//!
//! // Checksums fold across chunk boundaries
//! let mut running = Adler32::new();
//! running.update(b"Wiki");
//! running.update(b"pedia");
//! assert_eq!(running.value(), adler32(b"Wikipedia"));
//!
//! // Bits are read LSB-first and survive input exhaustion
//! let mut reader = BitReader::new();
//! let mut input = InputCursor::new(&[0b1010_1101]);
//! assert_eq!(reader.read_bits(&mut input, 3), Some(0b101));
//! assert_eq!(reader.read_bits(&mut input, 8), None);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler32;
pub mod bitstream;
pub mod error;
pub mod types;
pub mod window;

// Re-exports for convenience
pub use adler32::{Adler32, adler32};
pub use bitstream::{BitReader, BitWriter, InputCursor, OutputCursor};
pub use error::{Result, ZflateError};
pub use types::{CompressionLevel, Flush, Status, WindowBits, Wrapper};
pub use window::Window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adler32::{Adler32, adler32};
    pub use crate::error::{Result, ZflateError};
    pub use crate::types::{CompressionLevel, Flush, Status, WindowBits, Wrapper};
}
