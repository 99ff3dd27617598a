//! Zlib framing (RFC 1950) and one-shot helpers.
//!
//! # Format
//!
//! ```text
//! +---+---+=====================+============+---+---+---+---+
//! |CMF|FLG| DICTID (if FDICT)   | compressed |    ADLER32    |
//! +---+---+=====================+============+---+---+---+---+
//! ```
//!
//! - CMF: Compression Method and Flags
//!   - Bits 0-3: CM (Compression Method) - must be 8 for DEFLATE
//!   - Bits 4-7: CINFO (Compression Info) - log2(window size) - 8
//! - FLG: Flags
//!   - Bits 0-4: FCHECK - check bits so (CMF*256 + FLG) mod 31 == 0
//!   - Bit 5: FDICT - preset dictionary present
//!   - Bits 6-7: FLEVEL - compression level (0-3)
//! - DICTID: Adler-32 of the preset dictionary (big-endian)
//! - ADLER32: Adler-32 checksum of uncompressed data (big-endian)
//!
//! The helpers here drive a [`ZStream`] over whole in-memory buffers and
//! turn its status codes into [`ZflateError`]s.

use crate::config::{DeflateConfig, InflateConfig};
use crate::inflate::FDICT;
use crate::stream::ZStream;
use zflate_core::error::{Result, ZflateError};
use zflate_core::types::{Flush, Status};

/// Largest useful preset dictionary (32KB); longer ones are truncated to
/// their tail.
pub const MAX_DICTIONARY_SIZE: usize = 32768;

/// Output chunk size used by the one-shot helpers.
const CHUNK_SIZE: usize = 64 * 1024;

/// Zlib compression level indicator in header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Fastest compression.
    Fastest = 0,
    /// Fast compression.
    Fast = 1,
    /// Default compression.
    Default = 2,
    /// Maximum compression.
    Maximum = 3,
}

impl ZlibLevel {
    /// Convert from an effective compression level (0-9) to the header hint.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => Self::Fastest,
            2..=5 => Self::Fast,
            6 => Self::Default,
            _ => Self::Maximum,
        }
    }

    /// Decode the FLEVEL field of an FLG byte.
    pub fn from_flags(flg: u8) -> Self {
        match flg >> 6 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Fastest => "fastest",
            Self::Fast => "fast",
            Self::Default => "default",
            Self::Maximum => "maximum",
        }
    }
}

/// Parsed zlib header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// Window size exponent declared by CINFO (8-15).
    pub window_bits: u8,
    /// Compression level hint.
    pub level: ZlibLevel,
    /// Preset dictionary id, when FDICT is set.
    pub dictionary_id: Option<u32>,
}

impl ZlibHeader {
    /// Parse the header at the start of `input`.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let [cmf, flg, ..] = *input else {
            return Err(ZflateError::unexpected_eof(input.len() as u64));
        };
        if cmf & 0x0F != 8 {
            return Err(ZflateError::invalid_header("unknown compression method"));
        }
        let window_bits = (cmf >> 4) + 8;
        if window_bits > 15 {
            return Err(ZflateError::invalid_header("invalid window size"));
        }
        if ((u16::from(cmf) << 8) | u16::from(flg)) % 31 != 0 {
            return Err(ZflateError::invalid_header("incorrect header check"));
        }

        let dictionary_id = if flg & FDICT != 0 {
            let id = input
                .get(2..6)
                .ok_or_else(|| ZflateError::unexpected_eof(input.len() as u64))?;
            Some(u32::from_be_bytes([id[0], id[1], id[2], id[3]]))
        } else {
            None
        };

        Ok(Self {
            window_bits,
            level: ZlibLevel::from_flags(flg),
            dictionary_id,
        })
    }

    /// Header length in bytes, dictionary id included.
    pub fn header_len(&self) -> usize {
        if self.dictionary_id.is_some() { 6 } else { 2 }
    }

    /// Window size in bytes.
    pub fn window_size(&self) -> usize {
        1 << self.window_bits
    }
}

/// True when `input` starts with one of the four standard 32 KiB zlib
/// headers (`78 01`, `78 5E`, `78 9C`, `78 DA`).
pub fn is_zlib_compressed(input: &[u8]) -> bool {
    matches!(input, [0x78, 0x01 | 0x5E | 0x9C | 0xDA, ..])
}

/// Dictionary id of a stream that needs a preset dictionary.
pub fn requires_dictionary(input: &[u8]) -> Option<u32> {
    ZlibHeader::parse(input).ok()?.dictionary_id
}

pub(crate) fn stream_error(stream: &ZStream, status: Status) -> ZflateError {
    ZflateError::stream(status, stream.message().unwrap_or(status.description()))
}

/// Compress `input` into a zlib stream.
///
/// # Example
///
/// ```
/// use zflate_deflate::zlib::{compress, decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = compress(data, 6).unwrap();
/// let decompressed = decompress(&compressed).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn compress(input: &[u8], level: i32) -> Result<Vec<u8>> {
    compress_with_config(input, &DeflateConfig::new(level), None).map(|(out, _)| out)
}

/// Compress `input` and also return the Adler-32 stored in the trailer.
pub fn compress_with_adler(input: &[u8], level: i32) -> Result<(Vec<u8>, u32)> {
    compress_with_config(input, &DeflateConfig::new(level), None)
}

/// Compress `input` against a preset dictionary.
///
/// The stream header carries the dictionary's Adler-32 so the decompressor
/// knows which dictionary to supply.
pub fn compress_with_dictionary(input: &[u8], level: i32, dictionary: &[u8]) -> Result<Vec<u8>> {
    compress_with_config(input, &DeflateConfig::new(level), Some(dictionary)).map(|(out, _)| out)
}

/// Compress `input` with explicit parameters.
///
/// Returns the compressed bytes and the Adler-32 of `input` (1 for raw
/// streams, which carry no checksum).
pub fn compress_with_config(
    input: &[u8],
    config: &DeflateConfig,
    dictionary: Option<&[u8]>,
) -> Result<(Vec<u8>, u32)> {
    config.validate()?;
    let mut stream = ZStream::new();
    stream
        .deflate_init_with(config)
        .into_result(stream.message())?;
    if let Some(dictionary) = dictionary {
        stream
            .deflate_set_dictionary(dictionary)
            .into_result(stream.message())?;
    }

    let mut output = Vec::with_capacity(input.len() / 2 + 64);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut offset = 0;
    loop {
        let status = stream.deflate(&input[offset..], &mut chunk, Flush::Finish);
        offset += stream.next_in();
        output.extend_from_slice(&chunk[..stream.next_out()]);
        match status {
            Status::StreamEnd => break,
            Status::Ok => {}
            other => return Err(stream_error(&stream, other)),
        }
    }

    let adler = stream.adler();
    stream.deflate_end();
    Ok((output, adler))
}

/// Decompress a zlib stream.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    decompress_with_config(input, &InflateConfig::default(), None)
}

/// Decompress a zlib stream that was compressed with a preset dictionary.
pub fn decompress_with_dictionary(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    decompress_with_config(input, &InflateConfig::default(), Some(dictionary))
}

/// Decompress with explicit parameters.
///
/// Bytes after the end of the stream are ignored.
pub fn decompress_with_config(
    input: &[u8],
    config: &InflateConfig,
    dictionary: Option<&[u8]>,
) -> Result<Vec<u8>> {
    config.validate()?;
    let mut stream = ZStream::new();
    stream
        .inflate_init_with(config)
        .into_result(stream.message())?;

    let mut output = Vec::with_capacity(input.len().saturating_mul(3));
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut offset = 0;
    loop {
        let status = stream.inflate(&input[offset..], &mut chunk, Flush::NoFlush);
        offset += stream.next_in();
        output.extend_from_slice(&chunk[..stream.next_out()]);
        match status {
            Status::StreamEnd => break,
            Status::Ok => {}
            Status::NeedDict => {
                let Some(dictionary) = dictionary else {
                    return Err(ZflateError::NeedDictionary { id: stream.adler() });
                };
                let status = stream.inflate_set_dictionary(dictionary);
                if status == Status::DataError {
                    return Err(ZflateError::invalid_header(format!(
                        "dictionary id {:#010x} does not match the supplied dictionary",
                        stream.adler()
                    )));
                }
                status.into_result(stream.message())?;
            }
            Status::BufError => return Err(ZflateError::unexpected_eof(stream.total_in())),
            Status::DataError => return Err(data_error(&stream, &input[..offset])),
            other => return Err(stream_error(&stream, other)),
        }
    }

    tracing::debug!(
        compressed = stream.total_in(),
        decompressed = stream.total_out(),
        "zlib stream decoded"
    );
    stream.inflate_end();
    Ok(output)
}

/// Classify a data error by the engine's diagnostic.
pub(crate) fn data_error(stream: &ZStream, consumed: &[u8]) -> ZflateError {
    let message = stream.message().unwrap_or("corrupted data");
    match message {
        "unknown compression method" | "invalid window size" | "incorrect header check" => {
            ZflateError::invalid_header(message)
        }
        "incorrect data check" if consumed.len() >= 4 => {
            let tail = &consumed[consumed.len() - 4..];
            let expected = u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]);
            ZflateError::checksum_mismatch(expected, stream.adler())
        }
        "invalid distance too far back" => ZflateError::corrupted(stream.total_in(), message),
        m if m.contains("set") || m.contains("code") => ZflateError::invalid_huffman(m),
        m => ZflateError::corrupted(stream.total_in(), m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zflate_core::adler32::adler32;
    use zflate_core::types::Wrapper;

    #[test]
    fn test_roundtrip_simple() {
        let data = b"Hello, World! Hello, World! Hello, World!";
        let compressed = compress(data, 6).unwrap();
        assert_eq!(&compressed[..2], &[0x78, 0x9C]);
        assert!(is_zlib_compressed(&compressed));
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_compress_with_adler() {
        let (compressed, adler) = compress_with_adler(b"Wikipedia", 9).unwrap();
        assert_eq!(adler, 0x11E6_0398);
        assert_eq!(&compressed[compressed.len() - 4..], &adler.to_be_bytes());
    }

    #[test]
    fn test_header_parse() {
        let header = ZlibHeader::parse(&[0x78, 0xDA]).unwrap();
        assert_eq!(header.window_bits, 15);
        assert_eq!(header.window_size(), 32768);
        assert_eq!(header.level, ZlibLevel::Maximum);
        assert_eq!(header.dictionary_id, None);
        assert_eq!(header.header_len(), 2);

        assert!(matches!(
            ZlibHeader::parse(&[0x79, 0x9C]),
            Err(ZflateError::InvalidHeader { .. })
        ));
        assert!(matches!(
            ZlibHeader::parse(&[0x78, 0x9D]),
            Err(ZflateError::InvalidHeader { .. })
        ));
        assert!(matches!(
            ZlibHeader::parse(&[0x78]),
            Err(ZflateError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_is_zlib_compressed() {
        assert!(is_zlib_compressed(&[0x78, 0x01]));
        assert!(is_zlib_compressed(&[0x78, 0x5E, 0x00]));
        assert!(is_zlib_compressed(&[0x78, 0x9C]));
        assert!(is_zlib_compressed(&[0x78, 0xDA]));
        assert!(!is_zlib_compressed(&[0x78]));
        assert!(!is_zlib_compressed(&[0x78, 0xBB]));
        assert!(!is_zlib_compressed(&[0x1F, 0x8B]));
        assert!(!is_zlib_compressed(&[]));
    }

    #[test]
    fn test_dictionary_roundtrip() {
        let dictionary = b"The quick brown fox jumps over the lazy dog";
        let data = b"The quick brown fox jumps over the lazy cat";
        let compressed = compress_with_dictionary(data, 6, dictionary).unwrap();
        let plain = compress(data, 6).unwrap();
        assert!(compressed.len() < plain.len());

        assert_eq!(requires_dictionary(&compressed), Some(adler32(dictionary)));
        assert_eq!(requires_dictionary(&plain), None);

        assert_eq!(
            decompress_with_dictionary(&compressed, dictionary).unwrap(),
            data
        );
        assert!(matches!(
            decompress(&compressed),
            Err(ZflateError::NeedDictionary { id }) if id == adler32(dictionary)
        ));
        assert!(decompress_with_dictionary(&compressed, b"other").is_err());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut compressed = compress(b"checksum", 6).unwrap();
        let last = compressed.len() - 1;
        compressed[last] ^= 0x80;
        match decompress(&compressed) {
            Err(ZflateError::ChecksumMismatch { expected, computed }) => {
                assert_eq!(computed, adler32(b"checksum"));
                assert_ne!(expected, computed);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_stream() {
        let compressed = compress(b"truncate me please", 6).unwrap();
        let result = decompress(&compressed[..compressed.len() - 2]);
        assert!(matches!(result, Err(ZflateError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_raw_config() {
        let data = b"raw deflate payload, raw deflate payload";
        let deflate_config = DeflateConfig::new(6).with_wrapper(Wrapper::Raw);
        let (compressed, adler) = compress_with_config(data, &deflate_config, None).unwrap();
        assert_eq!(adler, 1);
        assert!(!is_zlib_compressed(&compressed));

        let restored = decompress_with_config(&compressed, &InflateConfig::RAW, None).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_level_names() {
        assert_eq!(ZlibLevel::from_level(6), ZlibLevel::Default);
        assert_eq!(ZlibLevel::from_level(1).name(), "fastest");
        assert_eq!(ZlibLevel::from_flags(0x5E), ZlibLevel::Fast);
    }
}
