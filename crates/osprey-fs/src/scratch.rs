//! Per-task scratch directories
//!
//! Each pipeline task stages its inputs in a directory with a
//! guaranteed-unique name, so concurrent workers never collide. The
//! directory is removed when the `ScratchDir` is dropped.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{Error, Result, space};

/// A uniquely named scratch directory, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a new scratch directory under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("osprey_")
            .tempdir_in(root)
            .map_err(|e| Error::io(root, e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy `source` into the scratch directory, keeping its file name.
    ///
    /// Fails with [`Error::StorageLow`] when the scratch device cannot hold
    /// the copy.
    pub fn stage(&self, source: &Path) -> Result<PathBuf> {
        let size = fs::metadata(source).map_err(|e| Error::io(source, e))?.len();
        let available = space::available_space(self.path())?;
        if available < size {
            return Err(Error::StorageLow {
                path: self.path().to_path_buf(),
                needed: size,
                available,
            });
        }

        let name = source
            .file_name()
            .ok_or_else(|| Error::io(source, std::io::ErrorKind::InvalidInput.into()))?;
        let target = self.path().join(name);
        fs::copy(source, &target).map_err(|e| Error::io(&target, e))?;
        Ok(target)
    }
}
