//! Checksum command implementation.

use crate::utils::CHUNK_SIZE;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use zflate_core::Adler32;

pub fn cmd_checksum(files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    for file in files {
        let mut reader = BufReader::new(File::open(file)?);
        let mut adler = Adler32::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            adler.update(&chunk[..n]);
        }
        println!("{:08x}  {}", adler.value(), file.display());
    }

    Ok(())
}
