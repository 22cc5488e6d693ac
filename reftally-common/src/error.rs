//! Common error types for reftally

use thiserror::Error;

/// Common result type for reftally operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the reftally services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed click-counter packet
    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::protocol::ProtocolError),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
