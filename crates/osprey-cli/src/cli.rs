//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Osprey - validate digitized image deliveries against the project ledger
#[derive(Parser, Debug)]
#[command(name = "osprey")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to $OSPREY_CONFIG, ./osprey.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Validate the delivery folders under the storage root
    ///
    /// Examples:
    ///   osprey run --once                              # single pass
    ///   osprey run                                     # service loop
    ///   osprey run --shard-index 0 --shard-count 3     # first of three workers
    Run {
        /// Run one pass and exit instead of looping
        #[arg(long)]
        once: bool,

        /// This worker's slice of the folder list (zero-based)
        #[arg(long, requires = "shard_count")]
        shard_index: Option<usize>,

        /// Number of workers sharing the storage root
        #[arg(long, requires = "shard_index")]
        shard_count: Option<usize>,
    },

    /// Load and validate the configuration, then check the external tools
    CheckConfig,
}
