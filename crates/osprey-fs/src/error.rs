//! Error types for osprey-fs

use std::path::PathBuf;

/// Result type for osprey-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in osprey-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Not enough space at {path}: need {needed} bytes, {available} available")]
    StorageLow {
        path: PathBuf,
        needed: u64,
        available: u64,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
