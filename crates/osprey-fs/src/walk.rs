//! Recursive enumeration of a delivery folder

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// List every regular file below `root`, sorted by path.
///
/// Symbolic links to directories are not followed.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                files.push(path);
            }
        }
    }

    files.sort();
    tracing::debug!(root = %root.display(), count = files.len(), "walked folder");
    Ok(files)
}
