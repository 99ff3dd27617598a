//! Detect command implementation.

use crate::utils::read_prefix;
use std::path::PathBuf;
use zflate_deflate::zlib::{ZlibHeader, is_zlib_compressed};

pub fn cmd_detect(files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    for file in files {
        let prefix = read_prefix(file, 6)?;

        let verdict = match ZlibHeader::parse(&prefix) {
            Ok(header) => match header.dictionary_id {
                Some(id) => format!(
                    "zlib stream, needs preset dictionary {:#010x} ({} byte window)",
                    id,
                    header.window_size()
                ),
                None if is_zlib_compressed(&prefix) => format!(
                    "zlib stream ({} byte window, {} compression)",
                    header.window_size(),
                    header.level.name()
                ),
                None => format!(
                    "zlib stream, non-standard header ({} byte window)",
                    header.window_size()
                ),
            },
            Err(_) => "not a zlib stream".to_string(),
        };

        println!("{}: {}", file.display(), verdict);
        if !prefix.is_empty() {
            tracing::debug!(magic = ?&prefix[..prefix.len().min(2)], "header bytes");
        }
    }

    Ok(())
}
