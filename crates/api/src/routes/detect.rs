//! Detection Route

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::pipeline::check_content_type;
use crate::AppState;

/// Response for detect endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub drowsy: bool,
    pub score: f32,
}

/// Run an uploaded JPEG through the detection pipeline.
///
/// The content type is checked before the body is read, so a rejected
/// upload never counts against the size limit.
pub async fn detect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<DetectResponse>, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    if let Err(e) = check_content_type(content_type.as_deref()) {
        counter!("drowsiness_requests_total", "outcome" => "rejected").increment(1);
        return Err(e.into());
    }

    let limit = state.max_upload_bytes;
    let body = axum::body::to_bytes(body, limit).await.map_err(|e| {
        warn!("Failed to read upload (limit {} bytes): {}", limit, e);
        counter!("drowsiness_requests_total", "outcome" => "rejected").increment(1);
        ApiError::PayloadTooLarge { limit }
    })?;

    // Decoding and inference are CPU-bound
    let pipeline = Arc::clone(&state.pipeline);
    let outcome = tokio::task::spawn_blocking(move || pipeline.handle(content_type.as_deref(), &body))
        .await
        .map_err(|e| {
            error!("Detection task failed: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    match outcome {
        Ok(detection) => {
            counter!("drowsiness_requests_total", "outcome" => "ok").increment(1);
            histogram!("drowsiness_score").record(detection.score as f64);
            Ok(Json(DetectResponse {
                drowsy: detection.is_drowsy,
                score: detection.score,
            }))
        }
        Err(e) => {
            let outcome = if e.is_client_error() { "rejected" } else { "failed" };
            counter!("drowsiness_requests_total", "outcome" => outcome).increment(1);
            Err(e.into())
        }
    }
}
