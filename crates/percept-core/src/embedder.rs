use image::RgbImage;
use thiserror::Error;

use crate::types::{BoundingBox, Encoding};

/// Errors from the face-embedding collaborator.
///
/// Always fatal to the calling operation — the gallery and matcher never
/// retry or swallow these.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("face detection failed: {0}")]
    DetectionFailed(String),
    #[error("encoding extraction failed: {0}")]
    EncodingFailed(String),
}

/// External face-embedding model.
///
/// Implementations detect faces in an RGB image and compute one
/// fixed-length encoding per detected box, in box order. Images handed
/// to implementations are always RGB8 — callers normalize channel order
/// before crossing this seam.
pub trait FaceEmbedder {
    /// Detect face bounding boxes. May return zero boxes; order is
    /// unspecified but stable within one call.
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, EmbedderError>;

    /// Compute one encoding per input box, same order as `boxes`.
    fn compute_encodings(
        &mut self,
        image: &RgbImage,
        boxes: &[BoundingBox],
    ) -> Result<Vec<Encoding>, EmbedderError>;
}
