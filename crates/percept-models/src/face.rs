//! ONNX face embedding backend.
//!
//! Pairs a lightweight face detector (UltraFace-style, 320×240 input
//! with normalized corner-box outputs) with an ArcFace-style encoder
//! that maps a 112×112 face crop to an L2-normalized vector. Together
//! they implement the [`FaceEmbedder`] seam for the gallery core.

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

use percept_core::{BoundingBox, EmbedderError, Encoding, FaceEmbedder};

use crate::nms::{nms, RawBox};

// --- Detector constants ---
const DET_INPUT_WIDTH: usize = 320;
const DET_INPUT_HEIGHT: usize = 240;
const DET_MEAN: f32 = 127.0;
const DET_STD: f32 = 128.0;
const DET_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DET_NMS_THRESHOLD: f32 = 0.4;

// --- Encoder constants ---
const ENC_INPUT_SIZE: usize = 112;
const ENC_MEAN: f32 = 127.5;
const ENC_STD: f32 = 127.5;

#[derive(Error, Debug)]
pub enum FaceModelError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Face embedding backend holding the detector and encoder sessions.
pub struct OnnxFaceEmbedder {
    detector: Session,
    encoder: Session,
}

impl OnnxFaceEmbedder {
    /// Load both ONNX models. Fails fast if either file is missing.
    pub fn load(detector_path: &str, encoder_path: &str) -> Result<Self, FaceModelError> {
        for path in [detector_path, encoder_path] {
            if !Path::new(path).exists() {
                return Err(FaceModelError::ModelNotFound(path.to_string()));
            }
        }

        let detector = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(detector_path)?;
        let encoder = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(encoder_path)?;

        tracing::info!(
            detector = detector_path,
            encoder = encoder_path,
            "face models loaded"
        );

        Ok(Self { detector, encoder })
    }

    /// Resize to the detector input and normalize to its distribution.
    fn preprocess_detection(image: &RgbImage) -> Array4<f32> {
        let resized = image::imageops::resize(
            image,
            DET_INPUT_WIDTH as u32,
            DET_INPUT_HEIGHT as u32,
            FilterType::Triangle,
        );
        let mut tensor = Array4::<f32>::zeros((1, 3, DET_INPUT_HEIGHT, DET_INPUT_WIDTH));
        for (x, y, px) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = (px[c] as f32 - DET_MEAN) / DET_STD;
            }
        }
        tensor
    }

    /// Crop one detected face (clamped to image bounds) and normalize it
    /// into the encoder input tensor.
    fn preprocess_crop(image: &RgbImage, bbox: &BoundingBox) -> Array4<f32> {
        let iw = image.width();
        let ih = image.height();

        let x = (bbox.x.max(0.0) as u32).min(iw.saturating_sub(1));
        let y = (bbox.y.max(0.0) as u32).min(ih.saturating_sub(1));
        let w = (bbox.width.max(1.0) as u32).min(iw - x).max(1);
        let h = (bbox.height.max(1.0) as u32).min(ih - y).max(1);

        let crop = image::imageops::crop_imm(image, x, y, w, h).to_image();
        let resized = image::imageops::resize(
            &crop,
            ENC_INPUT_SIZE as u32,
            ENC_INPUT_SIZE as u32,
            FilterType::Triangle,
        );

        let mut tensor = Array4::<f32>::zeros((1, 3, ENC_INPUT_SIZE, ENC_INPUT_SIZE));
        for (x, y, px) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = (px[c] as f32 - ENC_MEAN) / ENC_STD;
            }
        }
        tensor
    }
}

impl FaceEmbedder for OnnxFaceEmbedder {
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, EmbedderError> {
        let input = Self::preprocess_detection(image);
        let input_value = TensorRef::from_array_view(input.view())
            .map_err(|e| EmbedderError::DetectionFailed(e.to_string()))?;
        let outputs = self
            .detector
            .run(ort::inputs![input_value])
            .map_err(|e| EmbedderError::DetectionFailed(e.to_string()))?;

        // Output 0: scores [1, N, 2] (background, face).
        // Output 1: boxes  [1, N, 4] normalized corner coordinates.
        let (scores_shape, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::DetectionFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::DetectionFailed(format!("boxes: {e}")))?;

        let num = scores_shape.iter().nth(1).copied().unwrap_or(0) as usize;

        Ok(decode_detections(
            scores,
            boxes,
            num,
            image.width() as f32,
            image.height() as f32,
        ))
    }

    fn compute_encodings(
        &mut self,
        image: &RgbImage,
        boxes: &[BoundingBox],
    ) -> Result<Vec<Encoding>, EmbedderError> {
        let mut encodings = Vec::with_capacity(boxes.len());

        for bbox in boxes {
            let input = Self::preprocess_crop(image, bbox);
            let input_value = TensorRef::from_array_view(input.view())
                .map_err(|e| EmbedderError::EncodingFailed(e.to_string()))?;
            let outputs = self
                .encoder
                .run(ort::inputs![input_value])
                .map_err(|e| EmbedderError::EncodingFailed(e.to_string()))?;

            let (_, raw) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| EmbedderError::EncodingFailed(e.to_string()))?;

            encodings.push(Encoding {
                values: l2_normalize(raw),
            });
        }

        Ok(encodings)
    }
}

/// Threshold + NMS over the detector's raw outputs, mapping normalized
/// corner boxes into the coordinate frame of the input image.
fn decode_detections(
    scores: &[f32],
    boxes: &[f32],
    num: usize,
    width: f32,
    height: f32,
) -> Vec<BoundingBox> {
    let mut candidates = Vec::new();

    for i in 0..num {
        let score = scores.get(i * 2 + 1).copied().unwrap_or(0.0);
        if score <= DET_CONFIDENCE_THRESHOLD {
            continue;
        }
        let off = i * 4;
        if off + 3 >= boxes.len() {
            continue;
        }
        candidates.push(RawBox {
            x1: boxes[off] * width,
            y1: boxes[off + 1] * height,
            x2: boxes[off + 2] * width,
            y2: boxes[off + 3] * height,
            score,
            class: 0,
        });
    }

    nms(candidates, DET_NMS_THRESHOLD)
        .into_iter()
        .map(|b| BoundingBox {
            x: b.x1,
            y: b.y1,
            width: b.x2 - b.x1,
            height: b.y2 - b.y1,
            confidence: b.score,
        })
        .collect()
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
