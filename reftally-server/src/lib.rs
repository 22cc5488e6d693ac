//! reftally-server library interface
//!
//! Exposes the scoring context, device layer, and HTTP API for
//! integration testing.

pub mod api;
pub mod context;
pub mod device;
pub mod error;
pub mod referee;
pub mod storage;

pub use api::{build_router, AppState};
pub use context::ScoringContext;
pub use error::{Error, Result};
