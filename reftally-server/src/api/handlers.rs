//! REST handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use reftally_common::model::{RefereeSpec, Score};
use reftally_common::report::{self, ReportRow};

use super::AppState;
use crate::context::SetupSummary;
use crate::device::DeviceInfo;

/// Handler error mapped onto an HTTP status and JSON body
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "reftally-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /scan - cached device discovery snapshot
pub async fn scan(State(state): State<AppState>) -> Json<Vec<DeviceInfo>> {
    Json(state.ctx.provider().list())
}

#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub group: String,
    #[serde(default)]
    pub referees: Vec<RefereeSpec>,
}

/// POST /setup - install a judging configuration
pub async fn setup(
    State(state): State<AppState>,
    Json(req): Json<SetupRequest>,
) -> Result<Json<SetupSummary>, ApiError> {
    state
        .ctx
        .setup(&req.group, &req.referees)
        .await
        .map(Json)
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    /// refereeIndex → whether every bound device accepted the reset
    pub results: BTreeMap<u32, bool>,
}

/// POST /reset - reset every active referee
pub async fn reset(State(state): State<AppState>) -> Json<ResetResponse> {
    Json(ResetResponse {
        results: state.ctx.reset_all().await,
    })
}

/// POST /teardown - destroy the active configuration
pub async fn teardown(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.ctx.teardown().await;
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct ContestantRequest {
    pub name: String,
}

/// POST /contestant - set the tag applied to subsequently logged records
pub async fn set_contestant(
    State(state): State<AppState>,
    Json(req): Json<ContestantRequest>,
) -> Json<serde_json::Value> {
    state.ctx.set_contestant(&req.name).await;
    Json(json!({ "status": "ok", "contestant": req.name }))
}

/// GET /scores - current score snapshot per referee slot
pub async fn scores(State(state): State<AppState>) -> Json<BTreeMap<u32, Score>> {
    Json(state.ctx.scores().await)
}

/// GET /report - final standings across every group in the data dir
pub async fn report(State(state): State<AppState>) -> Json<Vec<ReportRow>> {
    Json(report::load_report(state.ctx.writer().data_dir()))
}
