//! check-config command implementation

use std::path::Path;

use colored::Colorize;
use osprey_meta::{ConfigLoader, OspreyConfig};
use osprey_tools::check_requirements;

use crate::error::Result;

/// Load and validate the configuration and report on it.
///
/// Invalid configuration is an error; missing tools are only reported.
pub fn run_check_config(config_path: Option<&Path>) -> Result<()> {
    let path = ConfigLoader::locate(config_path)?;
    let config = ConfigLoader::new().load(&path)?;

    println!("{} {}", "Configuration OK:".green().bold(), path.display());
    println!();
    print_config(&config);
    println!();

    match check_requirements(&config.tools, config.previews.is_some()) {
        Ok(()) => println!("{} all external tools found", "+".green()),
        Err(e) => println!("{} {}", "!".yellow(), e.to_string().yellow()),
    }
    Ok(())
}

fn print_config(config: &OspreyConfig) {
    println!("{}:   {}", "Project".dimmed(), config.project.alias.cyan());
    println!("{}:   {}", "Storage".dimmed(), config.project.storage.display());
    println!("{}:    {}", "Ledger".dimmed(), config.ledger.url);
    let key = if config.ledger.api_key.is_empty() {
        "missing".red()
    } else {
        "set".green()
    };
    println!("{}:   {}", "API key".dimmed(), key);
    println!("{}:   {}", "Workers".dimmed(), config.runtime.workers);
    match &config.previews {
        Some(previews) => println!("{}:  {}", "Previews".dimmed(), previews.root.display()),
        None => println!("{}:  {}", "Previews".dimmed(), "disabled".dimmed()),
    }
    if let Some(sequence) = &config.sequence {
        println!(
            "{}:  {}",
            "Sequence".dimmed(),
            sequence.tokens.join(&sequence.separator)
        );
    }
}
