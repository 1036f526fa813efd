//! Error types for ledger communication

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the ledger service.
///
/// Any of these aborts the current file or folder; the unit is retried on
/// the next pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure (connect, timeout, TLS)
    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-200 response
    #[error("{endpoint} returned HTTP {code}: {body}")]
    Status {
        endpoint: String,
        code: u16,
        body: String,
    },

    /// Response body is not the expected JSON shape
    #[error("Malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    /// `result` is neither `true` nor an array
    #[error("{endpoint} rejected the request: {body}")]
    Rejected { endpoint: String, body: String },

    /// Server version is incompatible with the configured one
    #[error("Ledger server version {found} is not compatible with {expected}")]
    VersionMismatch { expected: String, found: String },
}
