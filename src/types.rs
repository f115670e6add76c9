//! Shared error type for the gateway layer
//!
//! Backend-specific taxonomies live with their clients (`hdfs::HdfsError`,
//! `services::MlflowError`, `services::AirflowError`). `GatewayError` only
//! covers the server shell itself.

use thiserror::Error;

/// Gateway-level error
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O failure (socket bind, accept)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
