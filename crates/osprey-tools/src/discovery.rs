//! Locating the external programs

use std::path::{Path, PathBuf};
use std::process::Command;

use osprey_meta::ToolsConfig;

use crate::error::{Error, Result};

/// Resolve a program to a full path.
///
/// Explicit paths must name an existing file; bare names are looked up on
/// PATH.
pub fn resolve_path(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    #[cfg(target_os = "windows")]
    let which_cmd = "where";
    #[cfg(not(target_os = "windows"))]
    let which_cmd = "which";

    let output = Command::new(which_cmd).arg(program).output().ok()?;
    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let first_line = stdout.lines().next()?.trim();
        if !first_line.is_empty() {
            return Some(PathBuf::from(first_line));
        }
    }
    None
}

/// Check that every program the run needs is installed.
///
/// The tiler is only required when previews are enabled.
pub fn check_requirements(config: &ToolsConfig, previews: bool) -> Result<()> {
    let mut required = vec![&config.jhove, &config.exiftool, &config.magick];
    if previews {
        required.push(&config.vips);
    }

    let missing: Vec<String> = required
        .into_iter()
        .filter(|program| {
            let found = resolve_path(program);
            match &found {
                Some(path) => tracing::debug!(program = %program.display(), path = %path.display(), "found"),
                None => tracing::error!(program = %program.display(), "required program not found"),
            }
            found.is_none()
        })
        .map(|p| p.display().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingPrograms { missing })
    }
}
