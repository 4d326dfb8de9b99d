//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the on-disk cache tier
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Skip the on-disk cache tier
    #[arg(long, conflicts_with = "cache_dir")]
    pub no_disk: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Load a URL through memory, disk and network tiers
    Fetch {
        /// Resource URL
        url: String,
        /// Number of loads to perform through the same chain
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        repeat: u32,
        /// Print the payload as text instead of its size
        #[arg(short, long)]
        text: bool,
    },
    /// Record repeated loads in an observed history and print every snapshot
    Watch {
        /// Resource URL
        url: String,
        /// Number of loads to record
        #[arg(short = 'n', long, default_value_t = 3)]
        count: u32,
        /// Pause between loads, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}
