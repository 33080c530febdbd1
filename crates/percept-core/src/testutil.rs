//! Test doubles shared across the crate's unit tests.

use image::RgbImage;

use crate::embedder::{EmbedderError, FaceEmbedder};
use crate::types::{BoundingBox, Encoding};

/// Embedder that reports a fixed set of boxes and encodings on every
/// call, regardless of image content.
pub struct StubEmbedder {
    pub boxes: Vec<BoundingBox>,
    pub encodings: Vec<Encoding>,
}

impl FaceEmbedder for StubEmbedder {
    fn detect_faces(&mut self, _image: &RgbImage) -> Result<Vec<BoundingBox>, EmbedderError> {
        Ok(self.boxes.clone())
    }

    fn compute_encodings(
        &mut self,
        _image: &RgbImage,
        _boxes: &[BoundingBox],
    ) -> Result<Vec<Encoding>, EmbedderError> {
        Ok(self.encodings.clone())
    }
}

/// Embedder that derives detections from image content: a black
/// top-left pixel means "no face", anything else yields one full-image
/// face whose encoding is the top-left pixel scaled to [0, 1].
///
/// Solid-color test images survive downscaling unchanged, so the same
/// image produces the same encoding at enrollment and query time.
pub struct PixelEmbedder;

impl FaceEmbedder for PixelEmbedder {
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, EmbedderError> {
        let px = image.get_pixel(0, 0);
        if px[0] == 0 && px[1] == 0 && px[2] == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![BoundingBox {
            x: 0.0,
            y: 0.0,
            width: image.width() as f32,
            height: image.height() as f32,
            confidence: 1.0,
        }])
    }

    fn compute_encodings(
        &mut self,
        image: &RgbImage,
        boxes: &[BoundingBox],
    ) -> Result<Vec<Encoding>, EmbedderError> {
        let px = image.get_pixel(0, 0);
        let encoding = Encoding {
            values: vec![
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ],
        };
        Ok(vec![encoding; boxes.len()])
    }
}

/// Embedder whose every call fails; used to check error propagation.
pub struct FailingEmbedder;

impl FaceEmbedder for FailingEmbedder {
    fn detect_faces(&mut self, _image: &RgbImage) -> Result<Vec<BoundingBox>, EmbedderError> {
        Err(EmbedderError::DetectionFailed("stub failure".into()))
    }

    fn compute_encodings(
        &mut self,
        _image: &RgbImage,
        _boxes: &[BoundingBox],
    ) -> Result<Vec<Encoding>, EmbedderError> {
        Err(EmbedderError::EncodingFailed("stub failure".into()))
    }
}

pub fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, image::Rgb(rgb))
}
