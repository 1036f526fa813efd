//! Error types for osprey-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] osprey_core::Error),

    #[error(transparent)]
    Meta(#[from] osprey_meta::Error),

    #[error(transparent)]
    Ledger(#[from] osprey_ledger::Error),

    #[error(transparent)]
    Tools(#[from] osprey_tools::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
