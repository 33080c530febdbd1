//! Query-time face matching against the gallery.

use image::imageops::FilterType;
use image::RgbImage;

use crate::embedder::{EmbedderError, FaceEmbedder};
use crate::types::{FaceMatch, Gallery, UNKNOWN_NAME};

/// Default linear downscale applied to query frames before detection.
pub const DEFAULT_RESIZE_FACTOR: f32 = 0.25;
/// Default maximum Euclidean distance for a positive match.
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 0.6;

/// Matches faces in query frames against a gallery.
///
/// Frames are downscaled by `resize_factor` before detection to bound
/// cost — a speed/accuracy tradeoff the caller may tune. Result boxes
/// are mapped back to original-frame coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FaceMatcher {
    pub resize_factor: f32,
    pub distance_threshold: f32,
}

impl Default for FaceMatcher {
    fn default() -> Self {
        Self {
            resize_factor: DEFAULT_RESIZE_FACTOR,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

impl FaceMatcher {
    /// Detect and label every face in `frame`.
    ///
    /// A face farther than `distance_threshold` from every gallery entry
    /// (boundary inclusive: `d <= threshold` matches), or any face when
    /// the gallery is empty, is labeled `Unknown`. Zero detected faces
    /// yields an empty list, not an error.
    pub fn match_faces(
        &self,
        frame: &RgbImage,
        gallery: &Gallery,
        embedder: &mut dyn FaceEmbedder,
    ) -> Result<Vec<FaceMatch>, EmbedderError> {
        let small = self.downscale(frame);
        let boxes = embedder.detect_faces(&small)?;
        if boxes.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = embedder.compute_encodings(&small, &boxes)?;

        let mut matches = Vec::with_capacity(boxes.len());
        for (bbox, encoding) in boxes.iter().zip(encodings.iter()) {
            let name = match gallery.best_match(encoding) {
                Some((idx, distance)) if distance <= self.distance_threshold => {
                    gallery.entries()[idx].name.clone()
                }
                _ => UNKNOWN_NAME.to_string(),
            };
            matches.push(FaceMatch {
                rect: bbox.rescale(self.resize_factor),
                name,
            });
        }
        Ok(matches)
    }

    fn downscale(&self, frame: &RgbImage) -> RgbImage {
        if (self.resize_factor - 1.0).abs() < f32::EPSILON {
            return frame.clone();
        }
        let w = ((frame.width() as f32 * self.resize_factor).round() as u32).max(1);
        let h = ((frame.height() as f32 * self.resize_factor).round() as u32).max(1);
        image::imageops::resize(frame, w, h, FilterType::Triangle)
    }
}
