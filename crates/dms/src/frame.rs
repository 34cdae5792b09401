//! Decoded image frames

use image::{imageops::FilterType, ImageError, RgbImage};

/// Decoded RGB frame handed to the detector
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Decode an encoded image (JPEG, PNG, ...) into an RGB frame.
    ///
    /// The container format is sniffed from the bytes, so an upload that
    /// is labelled JPEG but carries another supported format still decodes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self {
            image: img.to_rgb8(),
        })
    }

    /// Wrap an already decoded RGB buffer
    pub fn from_rgb(image: RgbImage) -> Self {
        Self { image }
    }

    /// Frame width
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resize to the model input size
    pub fn resize(&self, width: u32, height: u32) -> RgbImage {
        image::imageops::resize(&self.image, width, height, FilterType::Triangle)
    }

    /// Borrow the underlying pixel buffer
    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }
}
