//! # zflate Deflate
//!
//! Pure Rust streaming zlib (RFC 1950) and DEFLATE (RFC 1951) codec.
//!
//! Both engines are resumable state machines: every call consumes as much
//! of the caller's input and fills as much of the caller's output as it
//! can, then reports a [`Status`]. Input and output may be split at any
//! byte boundary.
//!
//! ## Features
//!
//! - **Decompression**: all block types, preset dictionaries, zlib or raw
//!   framing, window sizes from 256 bytes to 32 KiB
//! - **Compression**: levels 0-9 with stored, fixed and dynamic blocks
//!   chosen per block by exact cost, sync and full flushes
//! - **Tooling**: one-shot helpers in [`zlib`], `io::Write` adapters in
//!   [`write`], header sniffing
//!
//! ## Example
//!
//! ```rust
//! use zflate_deflate::zlib::{compress, decompress};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = compress(original, 6).unwrap();
//! assert_eq!(&compressed[..2], &[0x78, 0x9C]);
//!
//! let decompressed = decompress(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No compression (stored blocks)
//! - Level 1-3: Greedy matching
//! - Level 4-9: Lazy matching (default is 6)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod stream;
pub mod tables;
pub mod write;
pub mod zlib;

// Re-exports
pub use config::{DeflateConfig, InflateConfig};
pub use deflate::DeflateState;
pub use inflate::{InflateMode, InflateState};
pub use stream::{Active, Direction, ZStream};
pub use write::{ZlibDecoder, ZlibEncoder};
pub use zflate_core::{CompressionLevel, Flush, Status, WindowBits, Wrapper, ZflateError};
pub use zlib::{ZlibHeader, ZlibLevel, compress, decompress, is_zlib_compressed};
