//! Decompress command implementation.

use super::CodecOptions;
use crate::utils::{CHUNK_SIZE, create_progress_bar, decompressed_name};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use zflate_deflate::ZlibDecoder;

pub fn cmd_decompress(
    input: &Path,
    output: Option<&Path>,
    codec: &CodecOptions,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.map_or_else(|| decompressed_name(input), Path::to_path_buf);
    if output == input {
        return Err(format!("refusing to overwrite input {}", input.display()).into());
    }
    let compressed = std::fs::metadata(input)?.len();

    let writer = BufWriter::new(File::create(&output)?);
    let mut decoder = ZlibDecoder::with_config(writer, &codec.inflate_config())?;
    if let Some(dictionary) = codec.load_dictionary()? {
        decoder = decoder.with_dictionary(&dictionary);
    }

    let pb = create_progress_bar(compressed, progress);
    pb.set_message("Decompressing");
    let mut reader = pb.wrap_read(BufReader::new(File::open(input)?));
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut trailing = 0u64;
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        let mut used = 0;
        while used < n && !decoder.is_done() {
            used += decoder.write(&chunk[used..n])?;
        }
        trailing += (n - used) as u64;
    }

    let mut writer = decoder.finish()?;
    writer.flush()?;
    pb.finish_with_message("Done");

    if trailing > 0 {
        tracing::warn!(trailing, "ignored bytes after the end of the stream");
    }
    let restored = std::fs::metadata(&output)?.len();
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        compressed,
        restored,
        "decompressed"
    );
    println!(
        "{} -> {} ({} -> {} bytes)",
        input.display(),
        output.display(),
        compressed,
        restored
    );

    Ok(())
}
