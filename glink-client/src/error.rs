//! Error types for glink-client
//!
//! One enum covers the whole client surface: tracker conditions
//! (`TaskNotFound`, `WaitTimeout`, `TaskCancelled`, `TaskFault`), remote
//! call failures, and local transport/configuration problems.

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Lookup against an unregistered task identifier
    #[error("Import task not found: {0}")]
    TaskNotFound(String),

    /// A `wait` call's deadline elapsed before the task completed
    #[error("Timed out waiting for import task {0}")]
    WaitTimeout(String),

    /// The task was cancelled before producing a result
    #[error("Import task {0} was cancelled")]
    TaskCancelled(String),

    /// The import worker hit an unhandled fault, re-raised to the waiter
    #[error("Import task {id} failed: {message}")]
    TaskFault { id: String, message: String },

    /// The remote service completed a call but reported failure
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// Transport-level error talking to the remote service
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Malformed response payload from the remote service
    #[error("Response parse error: {0}")]
    Parse(String),

    /// Configuration resolution failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model file scan error
    #[error("Scan error: {0}")]
    Scan(#[from] crate::import::scanner::ScanError),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
