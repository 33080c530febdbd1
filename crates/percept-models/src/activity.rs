//! Video activity recognition via ONNX Runtime.
//!
//! MoViNet-style clip classifier: a sequence of RGB frames becomes a
//! `[1, T, H, W, 3]` float tensor scaled to [0, 1], and the softmaxed
//! head picks one activity label.

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{ArrayD, IxDyn};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

use crate::classifier::{argmax, softmax, Classification};

const ACT_FRAME_SIZE: usize = 224;

#[derive(Error, Debug)]
pub enum ActivityError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("cannot read labels file {path}: {source}")]
    LabelsUnreadable {
        path: String,
        source: std::io::Error,
    },
    #[error("no frames to classify")]
    NoFrames,
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Clip-level activity classifier.
pub struct ActivityRecognizer {
    session: Session,
    labels: Vec<String>,
}

impl ActivityRecognizer {
    /// Load the model and its label list (one label per line, optional
    /// `name` header, optional leading id column).
    pub fn load(model_path: &str, labels_path: &str) -> Result<Self, ActivityError> {
        if !Path::new(model_path).exists() {
            return Err(ActivityError::ModelNotFound(model_path.to_string()));
        }

        let labels = read_labels(labels_path)?;

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            labels = labels.len(),
            "activity model loaded"
        );

        Ok(Self { session, labels })
    }

    /// Classify a clip of frames.
    pub fn recognize(&mut self, frames: &[RgbImage]) -> Result<Classification, ActivityError> {
        if frames.is_empty() {
            return Err(ActivityError::NoFrames);
        }

        let input = preprocess_clip(frames);
        let input_value = TensorRef::from_array_view(input.view())?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ActivityError::InferenceFailed(e.to_string()))?;

        let probs = softmax(logits);
        let (idx, confidence) = argmax(&probs).ok_or(ActivityError::NoFrames)?;

        let label = self
            .labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("activity {idx}"));

        Ok(Classification { label, confidence })
    }
}

/// Resize every frame to 224×224 and stack into `[1, T, H, W, 3]`
/// scaled to [0, 1]. Rank is dynamic because T varies per clip.
fn preprocess_clip(frames: &[RgbImage]) -> ArrayD<f32> {
    let t = frames.len();
    let size = ACT_FRAME_SIZE;
    let mut data = vec![0.0f32; t * size * size * 3];

    for (fi, frame) in frames.iter().enumerate() {
        let resized =
            image::imageops::resize(frame, size as u32, size as u32, FilterType::Triangle);
        for (x, y, px) in resized.enumerate_pixels() {
            let base = ((fi * size + y as usize) * size + x as usize) * 3;
            data[base] = px[0] as f32 / 255.0;
            data[base + 1] = px[1] as f32 / 255.0;
            data[base + 2] = px[2] as f32 / 255.0;
        }
    }

    // Shape is valid by construction; from_shape_vec cannot fail here.
    ArrayD::from_shape_vec(IxDyn(&[1, t, size, size, 3]), data)
        .unwrap_or_else(|_| ArrayD::zeros(IxDyn(&[1, t, size, size, 3])))
}

fn read_labels(path: &str) -> Result<Vec<String>, ActivityError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| ActivityError::LabelsUnreadable {
            path: path.to_string(),
            source,
        })?;

    let labels: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        // Take the last comma-separated column so `id,name` rows work.
        .map(|l| l.rsplit(',').next().unwrap_or(l).to_string())
        .skip_while(|l| l == "name")
        .collect();

    Ok(labels)
}
