//! API handlers for the HTTP front end

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::checks::{self, BackupMode, EntryResponse};
use crate::context::Services;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub metrics: Option<PrometheusHandle>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Check backup freshness, then back up every listed instance
pub async fn check_and_remediate(State(state): State<AppState>, body: Bytes) -> Response {
    let response =
        checks::backup_entry(&state.services, &body, BackupMode::CheckAndRemediate).await;
    entry_response(response)
}

/// Check backup freshness only
pub async fn check_backup(State(state): State<AppState>, body: Bytes) -> Response {
    let response = checks::backup_entry(&state.services, &body, BackupMode::CheckOnly).await;
    entry_response(response)
}

/// Check service-account key age
pub async fn check_keys(State(state): State<AppState>, body: Bytes) -> Response {
    let response = checks::key_entry(&state.services, &body).await;
    entry_response(response)
}

/// Prometheus exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

fn entry_response(response: EntryResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}
