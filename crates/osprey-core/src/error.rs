//! Error types for osprey-core

use std::path::PathBuf;

/// Result type for osprey-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while processing folders and files.
///
/// Validation failures are not errors; they are recorded in the ledger as
/// check results and folder statuses.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Scratch device cannot hold the next file; ends the run
    #[error("Scratch storage exhausted at {path}: need {needed} bytes, {available} available")]
    StorageExhausted {
        path: PathBuf,
        needed: u64,
        available: u64,
    },

    /// Pre- or post-pass script failed
    #[error("{stage} script {script} failed: {message}")]
    HookFailed {
        stage: String,
        script: PathBuf,
        message: String,
    },

    #[error("Worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    /// Tasks left unprocessed because workers could not start
    #[error("{missing} tasks were not processed")]
    TasksIncomplete { missing: usize },

    #[error("Invalid filename pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Storage root {path} is not a directory")]
    StorageRootMissing { path: PathBuf },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from osprey-fs
    #[error(transparent)]
    Fs(#[from] osprey_fs::Error),

    /// Configuration error from osprey-meta
    #[error(transparent)]
    Meta(#[from] osprey_meta::Error),

    /// Ledger communication error
    #[error(transparent)]
    Ledger(#[from] osprey_ledger::Error),

    /// External tool error
    #[error(transparent)]
    Tools(#[from] osprey_tools::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that must end the whole run rather than the current unit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StorageExhausted { .. }
                | Self::HookFailed { .. }
                | Self::WorkerPanicked { .. }
                | Self::StorageRootMissing { .. }
        )
    }

    /// Lift a low-space staging failure to [`Error::StorageExhausted`].
    pub(crate) fn from_staging(err: osprey_fs::Error) -> Self {
        match err {
            osprey_fs::Error::StorageLow {
                path,
                needed,
                available,
            } => Self::StorageExhausted {
                path,
                needed,
                available,
            },
            other => Self::Fs(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_low_becomes_fatal() {
        let err = Error::from_staging(osprey_fs::Error::StorageLow {
            path: "/scratch".into(),
            needed: 10,
            available: 1,
        });
        assert!(err.is_fatal());
        assert!(matches!(err, Error::StorageExhausted { needed: 10, .. }));
    }

    #[test]
    fn ledger_errors_are_not_fatal() {
        let err = Error::Ledger(osprey_ledger::Error::Rejected {
            endpoint: "update".into(),
            body: "{}".into(),
        });
        assert!(!err.is_fatal());
    }
}
