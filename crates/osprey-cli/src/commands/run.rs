//! Run command implementation

use std::path::Path;

use colored::Colorize;
use osprey_core::{RunMode, RunSummary, Runner, Shard};
use osprey_ledger::HttpConnector;
use osprey_meta::ConfigLoader;
use osprey_tools::{Toolkit, check_requirements};

use crate::error::{CliError, Result};
use crate::logging;

/// Turn the optional shard flags into a [`Shard`].
pub fn resolve_shard(index: Option<usize>, count: Option<usize>) -> Result<Option<Shard>> {
    match (index, count) {
        (Some(index), Some(count)) => Shard::new(index, count).map(Some).ok_or_else(|| {
            CliError::user(format!(
                "--shard-index {index} must be below --shard-count {count}"
            ))
        }),
        (None, None) => Ok(None),
        _ => Err(CliError::user(
            "--shard-index and --shard-count must be given together",
        )),
    }
}

/// Run the worker until done (`once`) or until a fatal error.
pub fn run_worker(config_path: Option<&Path>, verbose: bool, once: bool, shard: Option<Shard>) -> Result<()> {
    let path = ConfigLoader::locate(config_path)?;
    let config = ConfigLoader::new().load(&path)?;

    let log_file = logging::init(
        verbose,
        config.runtime.log_dir.as_deref(),
        &config.project.alias,
        shard,
    )?;
    tracing::info!(
        config = %path.display(),
        project = %config.project.alias,
        ?shard,
        log_file = ?log_file,
        "starting osprey"
    );

    check_requirements(&config.tools, config.previews.is_some())?;
    let tools = Toolkit::from_config(&config.tools);
    let connector = HttpConnector::new(&config.ledger, &config.project.alias);

    let mode = if once { RunMode::Once } else { RunMode::Service };
    let summary = Runner::new(&config, &connector, &tools)
        .with_shard(shard)
        .run(mode)?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("{}", "Pass complete".bold());
    println!("{}:  {}", "Folders".dimmed(), summary.folders);
    println!("{}: {}", "Completed".dimmed(), summary.completed.to_string().green());
    println!("{}:   {}", "Skipped".dimmed(), summary.skipped);
    let halted = summary.halted.to_string();
    println!(
        "{}:    {}",
        "Halted".dimmed(),
        if summary.halted > 0 { halted.yellow() } else { halted.normal() }
    );
    let errors = summary.errors.to_string();
    println!(
        "{}:    {}",
        "Errors".dimmed(),
        if summary.errors > 0 { errors.red() } else { errors.normal() }
    );
}
