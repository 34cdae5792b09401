//! Detection request pipeline
//!
//! Validates one upload, decodes it, runs the detector and records the
//! result. Steps run strictly in order and the first failure ends the
//! request:
//!
//! 1. `Content-Type` must contain `image/jpeg`
//! 2. the body must decode as an image
//! 3. the raw bytes are copied to the debug image store (if enabled)
//! 4. the detector produces a verdict and score
//! 5. the verdict is appended to the score log
//!
//! Storage failures in steps 3 and 5 are logged and counted but never
//! change the outcome of the request.

use dms::{Detection, Detector, DmsError, Frame};
use metrics::counter;
use std::sync::Arc;
use storage::{DebugImageStore, ScoreLog};
use thiserror::Error;
use tracing::{error, info, warn};

/// Accepted upload media type
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Reasons a detection request fails
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Content-Type must be image/jpeg")]
    UnsupportedContentType,

    #[error("Failed to decode image. File may be corrupted or not a valid image.")]
    Decode(#[source] image::ImageError),

    #[error("Detection failed")]
    Detector(#[from] DmsError),
}

impl PipelineError {
    /// Whether the caller can fix the request and resend it
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::UnsupportedContentType | PipelineError::Decode(_)
        )
    }
}

/// Request pipeline shared by all `/detect` handlers
pub struct DetectionPipeline {
    detector: Arc<dyn Detector>,
    score_log: Arc<ScoreLog>,
    debug_images: Option<Arc<DebugImageStore>>,
}

impl DetectionPipeline {
    pub fn new(detector: Arc<dyn Detector>, score_log: Arc<ScoreLog>) -> Self {
        Self {
            detector,
            score_log,
            debug_images: None,
        }
    }

    /// Keep a copy of every decodable upload
    pub fn with_debug_images(mut self, store: Arc<DebugImageStore>) -> Self {
        self.debug_images = Some(store);
        self
    }

    pub fn score_log(&self) -> &ScoreLog {
        &self.score_log
    }

    /// Run one upload through the pipeline
    pub fn handle(&self, content_type: Option<&str>, payload: &[u8]) -> Result<Detection, PipelineError> {
        check_content_type(content_type)?;

        let frame = Frame::decode(payload).map_err(|e| {
            warn!(
                "Failed to decode image. File may be corrupted or not a valid image. ({} bytes: {})",
                payload.len(),
                e
            );
            PipelineError::Decode(e)
        })?;
        info!(
            "Received image: {} bytes, {}x{}",
            payload.len(),
            frame.width(),
            frame.height()
        );

        if let Some(store) = &self.debug_images {
            if let Err(e) = store.save(payload) {
                warn!("Failed to write debug image: {}", e);
                counter!("drowsiness_storage_failures_total", "target" => "debug_image").increment(1);
            }
        }

        let detection = self.detector.detect(&frame).map_err(|e| {
            error!("Detector failed: {}", e);
            PipelineError::from(e)
        })?;

        match self.score_log.append(detection.is_drowsy, detection.score) {
            Ok(record) => info!(
                "Drowsiness score {} (drowsy: {}) logged at {}",
                record.score, record.is_drowsy, record.timestamp
            ),
            Err(e) => {
                error!("Failed to log drowsiness score: {}", e);
                counter!("drowsiness_storage_failures_total", "target" => "score_log").increment(1);
            }
        }

        Ok(detection)
    }
}

/// Substring match, so parameters such as `; charset=binary` are tolerated
pub fn check_content_type(content_type: Option<&str>) -> Result<(), PipelineError> {
    match content_type {
        Some(value) if value.to_ascii_lowercase().contains(JPEG_CONTENT_TYPE) => Ok(()),
        _ => Err(PipelineError::UnsupportedContentType),
    }
}
