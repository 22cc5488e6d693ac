//! Error types for the live scoring service

use thiserror::Error;

/// Result type for reftally-server operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Shared library error
    #[error(transparent)]
    Common(#[from] reftally_common::Error),

    /// Device transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] crate::device::TransportError),

    /// I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
