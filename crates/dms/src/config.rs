//! Detector configuration

use serde::{Deserialize, Serialize};

/// Pixel normalization applied before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `value / 255`
    #[default]
    ZeroToOne,
    /// `value / 127.5 - 1`
    MinusOneToOne,
}

impl Normalization {
    /// Map one 8-bit channel value into model input space
    pub fn apply(self, value: u8) -> f32 {
        match self {
            Normalization::ZeroToOne => value as f32 / 255.0,
            Normalization::MinusOneToOne => (value as f32 / 127.5) - 1.0,
        }
    }
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the ONNX drowsiness model
    pub model_path: Option<String>,

    /// Model input width in pixels
    pub input_width: u32,

    /// Model input height in pixels
    pub input_height: u32,

    /// Input normalization
    pub normalization: Normalization,

    /// Index of the drowsiness score within the first model output
    pub output_index: usize,

    /// Scores at or above this value are reported as drowsy
    pub drowsy_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_width: 224,
            input_height: 224,
            normalization: Normalization::ZeroToOne,
            output_index: 0,
            drowsy_threshold: 0.5,
        }
    }
}
