//! zflate CLI
//!
//! Compress, decompress and inspect zlib streams with a pure Rust codec.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::{
    CodecOptions, cmd_checksum, cmd_compress, cmd_decompress, cmd_detect, cmd_info,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "zflate")]
#[command(author, version, about = "Pure Rust zlib compression utility")]
#[command(long_about = "
zflate compresses and decompresses zlib (RFC 1950) and raw DEFLATE
(RFC 1951) streams.

Examples:
  zflate compress data.bin
  zflate compress data.bin -o data.zz -l 9
  zflate decompress data.zz
  zflate decompress payload.raw --raw -o payload.bin
  zflate detect *.zz
  zflate checksum data.bin
  zflate info data.zz --json
")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a zlib stream
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Output file (defaults to <input>.zz)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression level, -1 (default, 6) to 9
        #[arg(
            short,
            long,
            default_value_t = 6,
            allow_negative_numbers = true,
            value_parser = clap::value_parser!(i32).range(-1..=9)
        )]
        level: i32,

        #[command(flatten)]
        codec: CodecArgs,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress a zlib stream
    #[command(alias = "d")]
    Decompress {
        /// File to decompress
        input: PathBuf,

        /// Output file (defaults to <input> without .zz)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        codec: CodecArgs,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Report whether files start with a zlib header
    Detect {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the Adler-32 checksum of files
    Checksum {
        /// Files to checksum
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show header fields, sizes and integrity of a zlib stream
    #[command(alias = "i")]
    Info {
        /// Compressed file to inspect
        file: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

/// Stream options shared by compress and decompress.
#[derive(clap::Args)]
struct CodecArgs {
    /// Window size as a power of two, 8 to 15
    #[arg(
        short,
        long,
        default_value_t = 15,
        value_parser = clap::value_parser!(u8).range(8..=15)
    )]
    window_bits: u8,

    /// Raw DEFLATE data without the zlib header and trailer
    #[arg(long)]
    raw: bool,

    /// File holding a preset dictionary
    #[arg(short = 'D', long)]
    dictionary: Option<PathBuf>,
}

impl From<CodecArgs> for CodecOptions {
    fn from(args: CodecArgs) -> Self {
        Self {
            window_bits: args.window_bits,
            raw: args.raw,
            dictionary: args.dictionary,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            level,
            codec,
            progress,
        } => cmd_compress(&input, output.as_deref(), level, &codec.into(), progress),
        Commands::Decompress {
            input,
            output,
            codec,
            progress,
        } => cmd_decompress(&input, output.as_deref(), &codec.into(), progress),
        Commands::Detect { files } => cmd_detect(&files),
        Commands::Checksum { files } => cmd_checksum(&files),
        Commands::Info { file, json } => cmd_info(&file, json),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
