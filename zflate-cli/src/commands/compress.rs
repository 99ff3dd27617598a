//! Compress command implementation.

use super::CodecOptions;
use crate::utils::{compressed_name, create_progress_bar, space_savings};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use zflate_deflate::ZlibEncoder;

pub fn cmd_compress(
    input: &Path,
    output: Option<&Path>,
    level: i32,
    codec: &CodecOptions,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.map_or_else(|| compressed_name(input), Path::to_path_buf);
    let config = codec.deflate_config(level);
    let original = std::fs::metadata(input)?.len();

    let writer = BufWriter::new(File::create(&output)?);
    let mut encoder = ZlibEncoder::with_config(writer, &config)?;
    if let Some(dictionary) = codec.load_dictionary()? {
        encoder.set_dictionary(&dictionary)?;
    }

    let pb = create_progress_bar(original, progress);
    pb.set_message("Compressing");
    let mut reader = pb.wrap_read(BufReader::new(File::open(input)?));
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;
    pb.finish_with_message("Done");

    let compressed = std::fs::metadata(&output)?.len();
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        original,
        compressed,
        "compressed"
    );
    println!(
        "{} -> {} ({} -> {} bytes, {:.1}% saved)",
        input.display(),
        output.display(),
        original,
        compressed,
        space_savings(original, compressed)
    );

    Ok(())
}
