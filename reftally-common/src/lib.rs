//! # reftally Common Library
//!
//! Shared code for the reftally services including:
//! - Click-counter wire protocol (packet decode, reset command)
//! - Scoring data model (roles, modes, scores, setup requests)
//! - Event bus and notification payloads
//! - Append-only event-log codec (file naming, header, row format)
//! - Final-score report aggregation
//! - Configuration resolution

pub mod config;
pub mod error;
pub mod event_log;
pub mod events;
pub mod model;
pub mod protocol;
pub mod report;

pub use error::{Error, Result};
