//! Consistency checks for a loaded configuration

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::{Error, OspreyConfig, Result};

/// Validate config invariants that serde cannot express.
pub fn validate(config: &OspreyConfig, path: &Path) -> Result<()> {
    let invalid = |message: String| Error::InvalidConfig {
        path: path.to_path_buf(),
        message,
    };

    if config.project.alias.trim().is_empty() {
        return Err(invalid("project.alias must not be empty".into()));
    }
    if !(config.ledger.url.starts_with("http://") || config.ledger.url.starts_with("https://")) {
        return Err(invalid(format!(
            "ledger.url must be an http(s) URL, got {:?}",
            config.ledger.url
        )));
    }
    if config.runtime.workers == 0 {
        return Err(invalid("runtime.workers must be at least 1".into()));
    }
    if config.layout.main_extensions.is_empty() {
        return Err(invalid("layout.main_extensions must not be empty".into()));
    }

    Regex::new(&config.project.folder_date_pattern)
        .map_err(|e| invalid(format!("project.folder_date_pattern: {e}")))?;
    if let Some(pattern) = &config.checks.filename_pattern {
        Regex::new(pattern).map_err(|e| invalid(format!("checks.filename_pattern: {e}")))?;
    }

    if let Some(previews) = &config.previews {
        if let Some(ratio) = previews.min_free_ratio.filter(|r| !(0.0..=1.0).contains(r)) {
            return Err(invalid(format!(
                "previews.min_free_ratio must be within [0, 1], got {ratio}"
            )));
        }
        if previews.width == 0 {
            return Err(invalid("previews.width must be positive".into()));
        }
    }

    if let Some(sequence) = &config.sequence {
        if sequence.tokens.is_empty() {
            return Err(invalid("sequence.tokens must not be empty".into()));
        }
        if sequence.separator.is_empty() {
            return Err(invalid("sequence.separator must not be empty".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = sequence.tokens.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(invalid(format!("sequence.tokens repeats {dup:?}")));
        }
    }

    Ok(())
}
