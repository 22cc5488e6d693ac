//! HTTP API surface
//!
//! Axum router over the scoring context: configuration, reset fan-out,
//! score snapshots, report aggregation, and the SSE event stream. CORS is
//! permissive; the service is meant for a trusted venue network.

pub mod handlers;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::context::ScoringContext;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<ScoringContext>,
}

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/scan", get(handlers::scan))
        .route("/setup", post(handlers::setup))
        .route("/reset", post(handlers::reset))
        .route("/teardown", post(handlers::teardown))
        .route("/contestant", post(handlers::set_contestant))
        .route("/scores", get(handlers::scores))
        .route("/report", get(handlers::report))
        .route("/events", get(sse::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
