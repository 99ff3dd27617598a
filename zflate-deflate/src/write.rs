//! `io::Write` adapters around a [`ZStream`].
//!
//! [`ZlibEncoder`] compresses everything written to it into an inner writer;
//! [`ZlibDecoder`] does the reverse. Both must be finished with `finish()` to
//! learn about errors at the end of the stream; dropping them finishes on a
//! best-effort basis.

use std::io::{self, Write};

use crate::config::{DeflateConfig, InflateConfig};
use crate::stream::ZStream;
use crate::zlib::{data_error, stream_error};
use zflate_core::error::ZflateError;
use zflate_core::types::{Flush, Status};

/// Size of the intermediate output buffer.
const BUFFER_SIZE: usize = 32 * 1024;

/// A writer that compresses data into a zlib stream.
///
/// # Example
///
/// ```
/// use std::io::Write;
/// use zflate_deflate::write::ZlibEncoder;
///
/// let mut encoder = ZlibEncoder::new(Vec::new(), 6).unwrap();
/// encoder.write_all(b"streamed through an encoder").unwrap();
/// let compressed = encoder.finish().unwrap();
/// assert_eq!(
///     zflate_deflate::zlib::decompress(&compressed).unwrap(),
///     b"streamed through an encoder"
/// );
/// ```
#[derive(Debug)]
pub struct ZlibEncoder<W: Write> {
    inner: Option<W>,
    stream: ZStream,
    buffer: Vec<u8>,
    finished: bool,
}

impl<W: Write> ZlibEncoder<W> {
    /// Create an encoder at `level` with the default window.
    pub fn new(inner: W, level: i32) -> io::Result<Self> {
        Self::with_config(inner, &DeflateConfig::new(level))
    }

    /// Create an encoder from a configuration.
    pub fn with_config(inner: W, config: &DeflateConfig) -> io::Result<Self> {
        config.validate()?;
        let mut stream = ZStream::new();
        stream
            .deflate_init_with(config)
            .into_result(stream.message())?;
        Ok(Self {
            inner: Some(inner),
            stream,
            buffer: vec![0u8; BUFFER_SIZE],
            finished: false,
        })
    }

    /// Preload a dictionary; only valid before the first write.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> io::Result<()> {
        self.stream
            .deflate_set_dictionary(dictionary)
            .into_result(self.stream.message())?;
        Ok(())
    }

    /// Get a reference to the inner writer.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Get a mutable reference to the inner writer.
    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.inner.as_mut()
    }

    /// Uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.stream.total_in()
    }

    /// Compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.stream.total_out()
    }

    /// Write the end of the stream and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.do_finish()?;
        self.inner
            .take()
            .ok_or_else(|| io::Error::other("inner writer already taken"))
    }

    fn do_finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        loop {
            let status = self.run(&[], Flush::Finish)?;
            if status == Status::StreamEnd {
                break;
            }
        }
        self.finished = true;
        self.stream.deflate_end();
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }

    /// One engine call; compressed output goes straight to the inner writer.
    fn run(&mut self, input: &[u8], flush: Flush) -> io::Result<Status> {
        let status = self.stream.deflate(input, &mut self.buffer, flush);
        let produced = self.stream.next_out();
        if produced > 0 {
            let inner = self
                .inner
                .as_mut()
                .ok_or_else(|| io::Error::other("inner writer already taken"))?;
            inner.write_all(&self.buffer[..produced])?;
        }
        match status {
            Status::Ok | Status::StreamEnd | Status::BufError => Ok(status),
            other => Err(stream_error(&self.stream, other).into()),
        }
    }
}

impl<W: Write> Write for ZlibEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::other("encoder already finished"));
        }
        let mut offset = 0;
        while offset < buf.len() {
            let status = self.run(&buf[offset..], Flush::NoFlush)?;
            offset += self.stream.next_in();
            if status == Status::BufError {
                break;
            }
        }
        Ok(offset)
    }

    /// Emit a sync flush point so everything written so far can be decoded.
    fn flush(&mut self) -> io::Result<()> {
        if !self.finished {
            loop {
                let status = self.run(&[], Flush::SyncFlush)?;
                if status == Status::BufError || self.stream.avail_out() > 0 {
                    break;
                }
            }
        }
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for ZlibEncoder<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.do_finish();
        }
    }
}

/// A writer that decompresses a zlib stream into an inner writer.
///
/// Bytes written after the end of the stream are not accepted: `write`
/// returns the count up to the end of the stream and `Ok(0)` afterwards.
#[derive(Debug)]
pub struct ZlibDecoder<W: Write> {
    inner: Option<W>,
    stream: ZStream,
    buffer: Vec<u8>,
    dictionary: Option<Vec<u8>>,
    done: bool,
}

impl<W: Write> ZlibDecoder<W> {
    /// Create a decoder for a zlib stream with a 32 KiB window.
    pub fn new(inner: W) -> io::Result<Self> {
        Self::with_config(inner, &InflateConfig::default())
    }

    /// Create a decoder from a configuration.
    pub fn with_config(inner: W, config: &InflateConfig) -> io::Result<Self> {
        config.validate()?;
        let mut stream = ZStream::new();
        stream
            .inflate_init_with(config)
            .into_result(stream.message())?;
        Ok(Self {
            inner: Some(inner),
            stream,
            buffer: vec![0u8; BUFFER_SIZE],
            dictionary: None,
            done: false,
        })
    }

    /// Supply the preset dictionary in case the stream asks for one.
    pub fn with_dictionary(mut self, dictionary: &[u8]) -> Self {
        self.dictionary = Some(dictionary.to_vec());
        self
    }

    /// Get a reference to the inner writer.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Get a mutable reference to the inner writer.
    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.inner.as_mut()
    }

    /// True once the end of the stream has been decoded.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Check that the stream is complete and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.done {
            let status = self.run(&[], Flush::Finish)?;
            if status != Status::StreamEnd {
                return Err(ZflateError::unexpected_eof(self.stream.total_in()).into());
            }
        }
        let mut inner = self
            .inner
            .take()
            .ok_or_else(|| io::Error::other("inner writer already taken"))?;
        inner.flush()?;
        Ok(inner)
    }

    /// One engine call; decoded output goes straight to the inner writer.
    fn run(&mut self, input: &[u8], flush: Flush) -> io::Result<Status> {
        let status = self.stream.inflate(input, &mut self.buffer, flush);
        let produced = self.stream.next_out();
        if produced > 0 {
            let inner = self
                .inner
                .as_mut()
                .ok_or_else(|| io::Error::other("inner writer already taken"))?;
            inner.write_all(&self.buffer[..produced])?;
        }
        match status {
            Status::Ok | Status::BufError => Ok(status),
            Status::StreamEnd => {
                self.done = true;
                Ok(status)
            }
            Status::NeedDict => {
                let Some(dictionary) = self.dictionary.as_deref() else {
                    return Err(ZflateError::NeedDictionary {
                        id: self.stream.adler(),
                    }
                    .into());
                };
                self.stream
                    .inflate_set_dictionary(dictionary)
                    .into_result(self.stream.message())?;
                Ok(Status::Ok)
            }
            Status::DataError => {
                Err(data_error(&self.stream, &input[..self.stream.next_in()]).into())
            }
            other => Err(stream_error(&self.stream, other).into()),
        }
    }
}

impl<W: Write> Write for ZlibDecoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut offset = 0;
        while !self.done {
            let status = self.run(&buf[offset..], Flush::NoFlush)?;
            offset += self.stream.next_in();
            if status == Status::BufError {
                break;
            }
            if offset == buf.len() && self.stream.avail_out() > 0 {
                break;
            }
        }
        Ok(offset)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zlib::{compress, compress_with_dictionary, decompress};

    fn sample() -> Vec<u8> {
        (0..20_000u32)
            .flat_map(|i| format!("line {} of the sample\n", i % 97).into_bytes())
            .collect()
    }

    #[test]
    fn test_encoder_roundtrip() {
        let data = sample();
        let mut encoder = ZlibEncoder::new(Vec::new(), 6).unwrap();
        for chunk in data.chunks(1000) {
            encoder.write_all(chunk).unwrap();
        }
        assert_eq!(encoder.total_in(), data.len() as u64);
        let compressed = encoder.finish().unwrap();
        assert!(compressed.len() < data.len() / 4);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_encoder_flush_is_decodable() {
        let mut encoder = ZlibEncoder::new(Vec::new(), 6).unwrap();
        encoder.write_all(b"first part").unwrap();
        encoder.flush().unwrap();
        let partial = encoder.get_ref().unwrap().clone();
        assert_eq!(&partial[partial.len() - 4..], &[0x00, 0x00, 0xFF, 0xFF]);

        let mut decoder = ZlibDecoder::new(Vec::new()).unwrap();
        decoder.write_all(&partial).unwrap();
        assert_eq!(decoder.get_ref().unwrap(), b"first part");
        assert!(!decoder.is_done());
    }

    #[test]
    fn test_encoder_rejects_bad_level() {
        assert!(ZlibEncoder::new(Vec::new(), 12).is_err());
    }

    #[test]
    fn test_decoder_roundtrip() {
        let data = sample();
        let compressed = compress(&data, 9).unwrap();
        let mut decoder = ZlibDecoder::new(Vec::new()).unwrap();
        for chunk in compressed.chunks(777) {
            decoder.write_all(chunk).unwrap();
        }
        assert!(decoder.is_done());
        assert_eq!(decoder.finish().unwrap(), data);
    }

    #[test]
    fn test_decoder_stops_at_stream_end() {
        let mut compressed = compress(b"payload", 6).unwrap();
        let len = compressed.len();
        compressed.extend_from_slice(b"trailing");
        let mut decoder = ZlibDecoder::new(Vec::new()).unwrap();
        assert_eq!(decoder.write(&compressed).unwrap(), len);
        assert_eq!(decoder.write(b"more").unwrap(), 0);
        assert_eq!(decoder.finish().unwrap(), b"payload");
    }

    #[test]
    fn test_decoder_truncated() {
        let compressed = compress(b"some payload that gets cut", 6).unwrap();
        let mut decoder = ZlibDecoder::new(Vec::new()).unwrap();
        decoder.write_all(&compressed[..compressed.len() - 3]).unwrap();
        let err = decoder.finish().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_decoder_corrupt() {
        let mut decoder = ZlibDecoder::new(Vec::new()).unwrap();
        let err = decoder.write(&[0x78, 0x9D, 0x00]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_decoder_dictionary() {
        let dictionary = b"common prefix shared by both ends";
        let compressed =
            compress_with_dictionary(b"common prefix shared by both ends!", 6, dictionary).unwrap();

        let mut missing = ZlibDecoder::new(Vec::new()).unwrap();
        assert!(missing.write_all(&compressed).is_err());

        let mut decoder = ZlibDecoder::new(Vec::new())
            .unwrap()
            .with_dictionary(dictionary);
        decoder.write_all(&compressed).unwrap();
        assert_eq!(
            decoder.finish().unwrap(),
            b"common prefix shared by both ends!"
        );
    }

    #[test]
    fn test_encoder_dictionary() {
        let dictionary = b"shared vocabulary";
        let mut encoder = ZlibEncoder::new(Vec::new(), 9).unwrap();
        encoder.set_dictionary(dictionary).unwrap();
        encoder.write_all(b"shared vocabulary, shared again").unwrap();
        assert!(encoder.set_dictionary(dictionary).is_err());
        let compressed = encoder.finish().unwrap();
        assert_eq!(
            crate::zlib::requires_dictionary(&compressed),
            Some(zflate_core::adler32(dictionary))
        );

        let mut decoder = ZlibDecoder::new(Vec::new())
            .unwrap()
            .with_dictionary(dictionary);
        decoder.write_all(&compressed).unwrap();
        assert_eq!(
            decoder.finish().unwrap(),
            b"shared vocabulary, shared again"
        );
    }
}
