use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::security::{ClientKey, StoreStats};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub api_prefix: String,
    pub allowed_origins: usize,
    pub max_requests_per_window: u32,
    pub window_ms: u64,
    pub block_duration_ms: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ClientStatus {
    pub key: String,
    pub requests_in_window: usize,
    pub blocked: bool,
    pub latest_request_ms: Option<u64>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let policy = state.gate.policy();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        api_prefix: policy.scope.prefix().to_string(),
        allowed_origins: policy.cors.allowed_origins().len(),
        max_requests_per_window: policy.limits.max_requests,
        window_ms: policy.limits.window_ms,
        block_duration_ms: policy.limits.block_duration_ms,
    })
}

pub async fn get_clients(State(state): State<AdminState>) -> Json<StoreStats> {
    Json(state.gate.limiter().stats())
}

/// Window for one client. Counts are as of the last request, not pruned to now.
pub async fn get_client(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Result<Json<ClientStatus>, StatusCode> {
    let client = ClientKey::new(key);
    let window = state
        .gate
        .limiter()
        .snapshot(&client)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ClientStatus {
        key: client.to_string(),
        requests_in_window: window.len(),
        blocked: window.is_blocked(),
        latest_request_ms: window.latest(),
    }))
}

/// Forget a client, lifting any block.
pub async fn reset_client(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> StatusCode {
    let client = ClientKey::new(key);
    if state.gate.limiter().reset(&client) {
        tracing::info!(client = %client, "Client window reset by operator");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
