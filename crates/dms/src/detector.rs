//! Drowsiness detector capability and ONNX backend

use crate::{Detection, DetectorConfig, DmsError, Frame, Normalization};
use tract_onnx::prelude::*;
use tracing::{debug, error, info};

/// Converts a decoded frame into a drowsiness verdict and score.
///
/// Implementations are shared between concurrent requests, so they must
/// be callable from several threads at once.
pub trait Detector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Detection, DmsError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&self, frame: &Frame) -> Result<Detection, DmsError> {
        (**self).detect(frame)
    }
}

type Plan = TypedRunnableModel<TypedModel>;

/// Detector backed by an ONNX model run through tract
pub struct OnnxDetector {
    plan: Plan,
    input_width: u32,
    input_height: u32,
    normalization: Normalization,
    output_index: usize,
    threshold: f32,
}

impl OnnxDetector {
    /// Load and optimize the model named in the configuration
    pub fn load(config: &DetectorConfig) -> Result<Self, DmsError> {
        let path = config
            .model_path
            .as_deref()
            .ok_or_else(|| DmsError::Config("no model path configured".to_string()))?;

        if config.input_width == 0 || config.input_height == 0 {
            return Err(DmsError::Config(format!(
                "invalid model input size {}x{}",
                config.input_width, config.input_height
            )));
        }

        info!("Loading drowsiness model from {}", path);
        let shape = [1, 3, config.input_height as usize, config.input_width as usize];
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(shape).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                error!("Failed to load drowsiness model: {}", e);
                DmsError::ModelLoad(e.to_string())
            })?;

        Ok(Self {
            plan,
            input_width: config.input_width,
            input_height: config.input_height,
            normalization: config.normalization,
            output_index: config.output_index,
            threshold: config.drowsy_threshold,
        })
    }

    /// Build the 1x3xHxW input tensor
    fn preprocess(&self, frame: &Frame) -> Tensor {
        let resized = frame.resize(self.input_width, self.input_height);
        let norm = self.normalization;
        tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input_height as usize, self.input_width as usize),
            |(_, c, y, x)| norm.apply(resized.get_pixel(x as u32, y as u32)[c]),
        )
        .into()
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, frame: &Frame) -> Result<Detection, DmsError> {
        let input = self.preprocess(frame);

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| DmsError::Inference("model produced no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?;
        let score = view.iter().nth(self.output_index).copied().ok_or_else(|| {
            DmsError::Inference(format!(
                "output index {} out of range for output of {} values",
                self.output_index,
                view.len()
            ))
        })?;

        debug!("Model score {:.4}", score);
        Detection::from_score(score, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct MeanBrightness;

    impl Detector for MeanBrightness {
        fn detect(&self, frame: &Frame) -> Result<Detection, DmsError> {
            let img = frame.as_rgb();
            let total: u64 = img.pixels().map(|p| p[0] as u64).sum();
            let score = total as f32 / (img.width() * img.height() * 255) as f32;
            Detection::from_score(score, 0.5)
        }
    }

    #[test]
    fn test_boxed_detector_delegates() {
        let boxed: Box<dyn Detector> = Box::new(MeanBrightness);
        let dark = Frame::from_rgb(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])));
        let bright = Frame::from_rgb(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));

        assert!(!boxed.detect(&dark).unwrap().is_drowsy);
        assert!(boxed.detect(&bright).unwrap().is_drowsy);
    }

    #[test]
    fn test_load_rejects_zero_input_size() {
        let config = DetectorConfig {
            model_path: Some("model.onnx".to_string()),
            input_width: 0,
            ..Default::default()
        };
        assert!(matches!(OnnxDetector::load(&config), Err(DmsError::Config(_))));
    }
}
