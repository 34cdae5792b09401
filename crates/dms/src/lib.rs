//! Driver Monitoring System (DMS)
//!
//! Drowsiness detection capability used by the request pipeline:
//! - Decoded RGB frames built from uploaded images
//! - The `Detector` capability (verdict + score per frame)
//! - ONNX-backed detector driven by an external model file

pub mod analysis;
pub mod config;
pub mod detector;
pub mod frame;

pub use analysis::Detection;
pub use config::{DetectorConfig, Normalization};
pub use detector::{Detector, OnnxDetector};
pub use frame::Frame;

use thiserror::Error;
use tracing::info;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model produced a non-finite score: {0}")]
    InvalidScore(f32),
}

/// Build the detector described by the configuration.
///
/// A model path is mandatory: the service has no built-in detection
/// algorithm to fall back on.
pub fn load_detector(config: &DetectorConfig) -> Result<Box<dyn Detector>, DmsError> {
    if config.model_path.is_none() {
        return Err(DmsError::Config(
            "detector.model_path must point to an ONNX drowsiness model".to_string(),
        ));
    }

    let detector = OnnxDetector::load(config)?;
    info!(
        "Detector ready ({}x{}, threshold {})",
        config.input_width, config.input_height, config.drowsy_threshold
    );
    Ok(Box::new(detector))
}
