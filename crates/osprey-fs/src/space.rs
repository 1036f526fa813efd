//! Free-space probes for preview and scratch storage

use std::path::Path;

use crate::{Error, Result};

/// Fraction of the device holding `path` that is still available, in `[0, 1]`.
pub fn free_ratio(path: &Path) -> Result<f64> {
    let available = fs2::available_space(path).map_err(|e| Error::io(path, e))?;
    let total = fs2::total_space(path).map_err(|e| Error::io(path, e))?;
    if total == 0 {
        return Ok(0.0);
    }
    Ok(available as f64 / total as f64)
}

/// Bytes available to unprivileged writers on the device holding `path`.
pub fn available_space(path: &Path) -> Result<u64> {
    fs2::available_space(path).map_err(|e| Error::io(path, e))
}
