//! Error types for svp-client
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Protocol-level failures (non-200 status codes) are NOT
//! errors; they are returned as plain status values with state unchanged.

use thiserror::Error;

/// Main error type for the svp-client crate
#[derive(Error, Debug)]
pub enum Error {
    /// Socket I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failures that are not plain I/O errors
    /// (connection closed mid-exchange, unit source not prepared)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed wire data (unparseable status line, bad unit header)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration errors surfaced from svp-common
    #[error("Configuration error: {0}")]
    Config(#[from] svp_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using svp-client Error
pub type Result<T> = std::result::Result<T, Error>;
