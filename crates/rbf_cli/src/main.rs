//! RBF CLI
//!
//! Command-line tools for RBF log maintenance and debugging.
//!
//! # Commands
//!
//! - `inspect` - List recovered frames, newest first
//! - `verify` - Full integrity scan with a skipped-byte report

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RBF command-line log tools.
#[derive(Parser)]
#[command(name = "rbf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the frames recoverable from a log, newest first
    Inspect {
        /// Path to the log file
        file: PathBuf,

        /// Maximum number of frames to list
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Show up to this many leading payload bytes per frame
        #[arg(short, long, default_value = "0")]
        payload_bytes: usize,
    },

    /// Scan a log end to end and report integrity
    Verify {
        /// Path to the log file
        file: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect {
            file,
            limit,
            format,
            payload_bytes,
        } => {
            commands::inspect::run(&file, limit, &format, payload_bytes)?;
        }
        Commands::Verify { file } => {
            commands::verify::run(&file)?;
        }
        Commands::Version => {
            println!("rbf {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
