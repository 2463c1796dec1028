//! Error types for spftree

use thiserror::Error;

/// Main error type for spftree
///
/// Only conditions the caller must act on live here. Cycles, depth
/// exhaustion, missing policies below the root and transient DNS failures
/// are absorbed by the resolver and shape the tree instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("DNS error: {0}")]
    Dns(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for spftree
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) => 2,
            Error::NotFound(_) => 3,
            Error::Dns(_)
            | Error::Timeout(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::Other(_) => 1,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Dns(_) => "DNS_ERROR",
            Error::Timeout(_) => "TIMEOUT",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error is an unexpected fault rather than a verdict about
    /// the requested domain
    pub fn is_unexpected(&self) -> bool {
        !matches!(self, Error::InvalidInput(_) | Error::NotFound(_))
    }
}
