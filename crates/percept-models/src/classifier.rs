//! Single-label image classifier via ONNX Runtime.
//!
//! Generic softmax head over a fixed label list; the daemon uses it for
//! the currency model (MobileNetV2-style preprocessing).

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

const CLS_INPUT_SIZE: usize = 224;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("model produced no logits")]
    EmptyOutput,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Top-1 prediction.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// Softmax image classifier with an associated label list.
pub struct ImageClassifier {
    session: Session,
    labels: Vec<String>,
}

impl ImageClassifier {
    pub fn load(model_path: &str, labels: Vec<String>) -> Result<Self, ClassifierError> {
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = model_path, labels = labels.len(), "classifier loaded");

        Ok(Self { session, labels })
    }

    /// Classify one image, returning the top label and its probability.
    pub fn classify(&mut self, image: &RgbImage) -> Result<Classification, ClassifierError> {
        let input = preprocess(image);
        let input_value = TensorRef::from_array_view(input.view())?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(e.to_string()))?;

        let probs = softmax(logits);
        let (idx, confidence) = argmax(&probs).ok_or(ClassifierError::EmptyOutput)?;

        let label = self
            .labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("class {idx}"));

        Ok(Classification { label, confidence })
    }
}

/// Resize to 224×224 and scale pixels to [-1, 1], the MobileNetV2
/// input distribution.
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
        image,
        CLS_INPUT_SIZE as u32,
        CLS_INPUT_SIZE as u32,
        FilterType::Triangle,
    );
    let mut tensor = Array4::<f32>::zeros((1, 3, CLS_INPUT_SIZE, CLS_INPUT_SIZE));
    for (x, y, px) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = px[c] as f32 / 127.5 - 1.0;
        }
    }
    tensor
}

/// Numerically stable softmax.
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.iter().map(|&x| x / sum).collect()
    } else {
        exps
    }
}

/// Index and value of the largest element.
pub(crate) fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_shape() {
        let image = RgbImage::from_pixel(640, 480, image::Rgb([128, 128, 128]));
        let tensor = preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, CLS_INPUT_SIZE, CLS_INPUT_SIZE]);
    }

    #[test]
    fn test_preprocess_normalization_range() {
        let black = RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0]));
        let tensor = preprocess(&black);
        // 0 / 127.5 - 1 = -1
        assert!((tensor[[0, 0, 0, 0]] + 1.0).abs() < 1e-6);

        let white = RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
        let tensor = preprocess(&white);
        // 255 / 127.5 - 1 = 1
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        // Would overflow without the max shift.
        let probs = softmax(&[1000.0, 1001.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_tie_goes_to_first() {
        assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
    }
}
