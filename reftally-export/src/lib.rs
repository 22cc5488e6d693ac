//! reftally-export library interface
//!
//! Offline reconstruction of referee score logs into timeline documents.

pub mod captions;
pub mod error;
pub mod export;
pub mod loader;
pub mod timeline;

pub use error::{Error, Result};
