//! Osprey CLI
//!
//! Runs the validation worker against a storage root and its ledger.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            once,
            shard_index,
            shard_count,
        } => {
            let shard = commands::resolve_shard(shard_index, shard_count)?;
            commands::run_worker(config, cli.verbose, once, shard)
        }
        Commands::CheckConfig => commands::run_check_config(config),
    }
}
