//! Error types for the dashboard

use thiserror::Error;

/// Export/import failures
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Payload is not a valid network document
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures a network source may report.
///
/// The mock never produces these; a real backend must.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Timeout, refused connection and the like
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Unknown network id
    #[error("Network not found: {0}")]
    NotFound(String),

    /// Backend answered with something that is not a network
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
