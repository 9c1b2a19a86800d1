//! fieldstore CLI
//!
//! Inspection tools for blob layouts and table operation logs.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use fieldstore::blob::{unpack_address, BlobStore};
use fieldstore::log::LogRecovery;
use fieldstore::{Config, StreamEncoding};
use tracing_subscriber::{fmt, EnvFilter};

/// fieldstore CLI
#[derive(Parser, Debug)]
#[command(name = "fieldstore")]
#[command(about = "Inspect fieldstore blob layouts and table logs")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a file in an in-memory blob store and print its block layout
    Blob {
        /// File to store
        file: PathBuf,

        /// Store the blob zstd-compressed
        #[arg(short, long)]
        compress: bool,

        /// Volume capacity in bytes
        #[arg(long, default_value = "1048576")]
        volume_size: usize,

        /// Input read chunk in bytes
        #[arg(long, default_value = "51200")]
        buffer_size: usize,
    },

    /// Check a table log without modifying it
    VerifyLog {
        /// Path to a table.log file
        path: PathBuf,
    },

    /// Recover a table log, truncating a corrupted tail
    RecoverLog {
        /// Path to a table.log file
        path: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fieldstore=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> fieldstore::Result<()> {
    match command {
        Commands::Blob {
            file,
            compress,
            volume_size,
            buffer_size,
        } => {
            let config = Config::builder()
                .volume_size(volume_size)
                .stream_buffer_size(buffer_size)
                .build();
            config.validate()?;

            let store = BlobStore::new(&config);
            let out = if compress {
                StreamEncoding::Zstd
            } else {
                StreamEncoding::Identity
            };
            let mut input = BufReader::new(File::open(&file)?);
            let blob = store.write(&mut input, StreamEncoding::Identity, out)?;

            println!("file:     {}", file.display());
            println!("size:     {}", blob.size());
            println!("stored:   {}", blob.stored_size());
            println!("encoding: {:?}", blob.encoding());
            println!("digest:   {}", hex(blob.hash().unwrap_or_default()));
            println!("volumes:  {}", store.volume_count());
            for (i, block) in blob.blocks().iter().enumerate() {
                let (volume, offset) = unpack_address(block.address);
                println!(
                    "  block {:>4}  volume {:>4}  offset {:>8}  len {:>8}  {}",
                    i,
                    volume,
                    offset,
                    block.size,
                    hex(block.hash.as_deref().unwrap_or_default())
                );
            }
        }
        Commands::VerifyLog { path } => {
            let result = LogRecovery::verify(&path)?;
            println!("records:   {}", result.entries_recovered);
            println!("corrupted: {}", result.entries_corrupted);
            println!("last lsn:  {}", result.last_lsn);
            println!("valid len: {}", result.valid_len);
        }
        Commands::RecoverLog { path } => {
            let (_, result) = LogRecovery::recover(&path)?;
            println!("records:   {}", result.entries_recovered);
            println!("truncated: {}", result.was_truncated);
            println!("last lsn:  {}", result.last_lsn);
        }
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
