//! Error types for external tool invocations

use std::path::PathBuf;

/// Result type alias for tool operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Program could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Program exited with non-zero status where success was required
    #[error("{program} failed (exit code {code}): {stderr}")]
    CommandFailed {
        program: PathBuf,
        code: i32,
        stderr: String,
    },

    /// Program output could not be understood
    #[error("Failed to parse {program} output: {message}")]
    ParseError { program: PathBuf, message: String },

    /// Required programs are not installed
    #[error("Required programs not found: {}", .missing.join(", "))]
    MissingPrograms { missing: Vec<String> },
}
