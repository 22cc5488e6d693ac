//! Error types for the offline exporter

use thiserror::Error;

/// Result type for reftally-export operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No log directory exists for the requested group
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// File I/O errors while reading logs or writing artifacts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
