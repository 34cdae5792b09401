//! Liveness and health routes

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Fixed `{"message": ...}` body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// `GET /`
pub async fn home() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello, World!".to_string(),
    })
}

/// `GET /ping`
pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "pong".to_string(),
    })
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
