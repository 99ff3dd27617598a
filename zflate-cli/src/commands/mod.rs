//! Command implementations for zflate CLI.

pub mod checksum;
pub mod compress;
pub mod decompress;
pub mod detect;
pub mod info;

pub use checksum::cmd_checksum;
pub use compress::cmd_compress;
pub use decompress::cmd_decompress;
pub use detect::cmd_detect;
pub use info::cmd_info;

use std::path::PathBuf;
use zflate_deflate::{DeflateConfig, InflateConfig, Wrapper};

/// Stream parameters shared by `compress` and `decompress`.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Window size (log2), 8-15.
    pub window_bits: u8,
    /// Raw DEFLATE instead of a zlib stream.
    pub raw: bool,
    /// File holding a preset dictionary.
    pub dictionary: Option<PathBuf>,
}

impl CodecOptions {
    fn wrapper(&self) -> Wrapper {
        if self.raw { Wrapper::Raw } else { Wrapper::Zlib }
    }

    /// Compression parameters for `level`.
    pub fn deflate_config(&self, level: i32) -> DeflateConfig {
        DeflateConfig::new(level)
            .with_window_bits(self.window_bits)
            .with_wrapper(self.wrapper())
    }

    /// Decompression parameters.
    pub fn inflate_config(&self) -> InflateConfig {
        InflateConfig::default()
            .with_window_bits(self.window_bits)
            .with_wrapper(self.wrapper())
    }

    /// Read the dictionary file, if one was given.
    pub fn load_dictionary(&self) -> std::io::Result<Option<Vec<u8>>> {
        self.dictionary.as_ref().map(std::fs::read).transpose()
    }
}
