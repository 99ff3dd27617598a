//! Info command implementation.

use crate::utils::space_savings;
use serde::Serialize;
use std::path::{Path, PathBuf};
use zflate_deflate::zlib::ZlibHeader;
use zflate_deflate::{Flush, Status, ZStream};

/// Outcome of decoding the whole stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrity {
    /// Stream decoded and the trailer matched.
    Ok,
    /// Stream decoded but the trailer did not match.
    ChecksumMismatch,
    /// Stream needs a preset dictionary; not decoded.
    NeedsDictionary,
    /// Input ended before the stream did.
    Truncated,
    /// Malformed compressed data.
    Corrupted,
}

/// Everything `info` reports about one file.
#[derive(Debug, Serialize)]
pub struct StreamInfo {
    pub file: PathBuf,
    pub compressed_size: u64,
    pub method: &'static str,
    pub window_size: usize,
    pub level_hint: &'static str,
    pub dictionary_id: Option<u32>,
    pub uncompressed_size: Option<u64>,
    pub adler32: Option<u32>,
    pub trailing_bytes: u64,
    pub integrity: Integrity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamInfo {
    /// Inspect the zlib stream held in `data`.
    pub fn inspect(file: &Path, data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let header = ZlibHeader::parse(data)?;
        let mut info = Self {
            file: file.to_path_buf(),
            compressed_size: data.len() as u64,
            method: "deflate",
            window_size: header.window_size(),
            level_hint: header.level.name(),
            dictionary_id: header.dictionary_id,
            uncompressed_size: None,
            adler32: None,
            trailing_bytes: 0,
            integrity: Integrity::NeedsDictionary,
            error: None,
        };
        if header.dictionary_id.is_some() {
            return Ok(info);
        }

        // Decode into a scratch buffer, counting the output
        let mut stream = ZStream::new();
        stream.inflate_init(15).into_result(stream.message())?;
        let mut scratch = vec![0u8; 64 * 1024];
        let mut pos = 0;
        let mut produced = 0u64;
        let status = loop {
            let status = stream.inflate(&data[pos..], &mut scratch, Flush::NoFlush);
            pos += stream.next_in();
            produced += stream.next_out() as u64;
            if status != Status::Ok {
                break status;
            }
        };

        info.uncompressed_size = Some(produced);
        info.adler32 = Some(stream.adler());
        info.integrity = match status {
            Status::StreamEnd => {
                info.trailing_bytes = (data.len() - pos) as u64;
                Integrity::Ok
            }
            Status::BufError => Integrity::Truncated,
            _ if stream.message() == Some("incorrect data check") => Integrity::ChecksumMismatch,
            _ => Integrity::Corrupted,
        };
        if info.integrity != Integrity::Ok {
            info.error = Some(stream.message().unwrap_or(status.description()).to_string());
        }
        stream.end();
        Ok(info)
    }

    fn print(&self) {
        println!("Stream Information");
        println!("==================");
        println!("File: {}", self.file.display());
        println!("Compressed size: {} bytes", self.compressed_size);
        println!("Method: {}", self.method);
        println!("Window size: {} bytes", self.window_size);
        println!("Level hint: {}", self.level_hint);
        if let Some(id) = self.dictionary_id {
            println!("Preset dictionary: {:#010x}", id);
        }

        if let Some(size) = self.uncompressed_size {
            println!();
            println!("Contents:");
            println!("  Uncompressed size: {} bytes", size);
            if let Some(adler) = self.adler32 {
                println!("  Adler-32: {:08x}", adler);
            }
            if size > 0 {
                println!(
                    "  Compression ratio: {:.1}%",
                    space_savings(size, self.compressed_size)
                );
            }
            if self.trailing_bytes > 0 {
                println!("  Trailing bytes: {}", self.trailing_bytes);
            }
        }
        println!();
        match &self.error {
            Some(error) => println!("Integrity: {:?} ({})", self.integrity, error),
            None => println!("Integrity: {:?}", self.integrity),
        }
    }
}

pub fn cmd_info(file: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(file)?;
    let info = StreamInfo::inspect(file, &data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        info.print();
    }

    Ok(())
}
