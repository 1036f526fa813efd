//! Subscriber setup: stderr always, plus a per-run log file when configured.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use osprey_core::Shard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{CliError, Result};

/// `<log_dir>/<alias>[_w<shard>]_<YYYYmmdd_HHMMSS>.log`
pub fn log_file_path(log_dir: &Path, alias: &str, shard: Option<Shard>, stamp: &str) -> PathBuf {
    let name = match shard {
        Some(shard) => format!("{alias}_w{}_{stamp}.log", shard.index),
        None => format!("{alias}_{stamp}.log"),
    };
    log_dir.join(name)
}

/// Install the global subscriber; returns the log file path if one was opened.
pub fn init(verbose: bool, log_dir: Option<&Path>, alias: &str, shard: Option<Shard>) -> Result<Option<PathBuf>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, path) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
            let path = log_file_path(dir, alias, shard, &stamp);
            let file = File::create(&path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbose))
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {e}")))?;
    Ok(path)
}
