//! General object detection via ONNX Runtime.
//!
//! YOLO-family single-output decode: each row of the `[1, N, 85]`
//! output is `[cx, cy, w, h, objectness, 80 class scores]` in input
//! (640×640) coordinates. Detections are filtered by a configurable
//! confidence threshold and class-aware NMS, then mapped back to the
//! original image.

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::nms::{nms, RawBox};

const OBJ_INPUT_SIZE: usize = 640;
const OBJ_NMS_THRESHOLD: f32 = 0.45;
const OBJ_ROW_LEN: usize = 85;

/// Default minimum confidence for a reported detection.
pub const DEFAULT_OBJECT_CONFIDENCE: f32 = 0.6;

#[derive(Error, Debug)]
pub enum ObjectsError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// One detected object, in original-image corner coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub name: String,
    pub confidence: f32,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// YOLO-style object detector.
pub struct ObjectDetector {
    session: Session,
    confidence_threshold: f32,
}

impl ObjectDetector {
    pub fn load(model_path: &str, confidence_threshold: f32) -> Result<Self, ObjectsError> {
        if !Path::new(model_path).exists() {
            return Err(ObjectsError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            threshold = confidence_threshold,
            "object detector loaded"
        );

        Ok(Self {
            session,
            confidence_threshold,
        })
    }

    /// Detect objects in one image.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, ObjectsError> {
        let input = preprocess(image);
        let input_value = TensorRef::from_array_view(input.view())?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ObjectsError::InferenceFailed(e.to_string()))?;

        Ok(decode(
            raw,
            self.confidence_threshold,
            image.width() as f32,
            image.height() as f32,
        ))
    }
}

/// Resize (non-letterboxed) to 640×640 and scale pixels to [0, 1].
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
        image,
        OBJ_INPUT_SIZE as u32,
        OBJ_INPUT_SIZE as u32,
        FilterType::Triangle,
    );
    let mut tensor = Array4::<f32>::zeros((1, 3, OBJ_INPUT_SIZE, OBJ_INPUT_SIZE));
    for (x, y, px) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = px[c] as f32 / 255.0;
        }
    }
    tensor
}

fn decode(raw: &[f32], confidence_threshold: f32, width: f32, height: f32) -> Vec<Detection> {
    let scale_x = width / OBJ_INPUT_SIZE as f32;
    let scale_y = height / OBJ_INPUT_SIZE as f32;

    let mut candidates = Vec::new();

    for row in raw.chunks_exact(OBJ_ROW_LEN) {
        let objectness = row[4];
        let (class, class_score) = match crate::classifier::argmax(&row[5..]) {
            Some(best) => best,
            None => continue,
        };
        let confidence = objectness * class_score;
        if confidence < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        candidates.push(RawBox {
            x1: (cx - w / 2.0) * scale_x,
            y1: (cy - h / 2.0) * scale_y,
            x2: (cx + w / 2.0) * scale_x,
            y2: (cy + h / 2.0) * scale_y,
            score: confidence,
            class,
        });
    }

    nms(candidates, OBJ_NMS_THRESHOLD)
        .into_iter()
        .map(|b| Detection {
            name: COCO_NAMES
                .get(b.class)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("class {}", b.class)),
            confidence: b.score,
            xmin: b.x1.max(0.0).min(width),
            ymin: b.y1.max(0.0).min(height),
            xmax: b.x2.max(0.0).min(width),
            ymax: b.y2.max(0.0).min(height),
        })
        .collect()
}

const COCO_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

#[cfg(test)]
mod tests {
    use super::*;

    /// Build one output row with the given box, objectness and class.
    fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, class: usize, score: f32) -> Vec<f32> {
        let mut r = vec![cx, cy, w, h, obj];
        let mut classes = vec![0.0f32; 80];
        classes[class] = score;
        r.extend(classes);
        r
    }

    #[test]
    fn test_decode_filters_low_confidence() {
        // objectness * class score = 0.5 * 0.5 = 0.25, below 0.6.
        let raw = row(320.0, 320.0, 100.0, 100.0, 0.5, 2, 0.5);
        let dets = decode(&raw, DEFAULT_OBJECT_CONFIDENCE, 640.0, 640.0);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_decode_maps_to_image_coordinates() {
        // Input image half the model size in each axis.
        let raw = row(320.0, 320.0, 100.0, 200.0, 0.9, 2, 0.9);
        let dets = decode(&raw, 0.6, 320.0, 320.0);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert_eq!(d.name, "car");
        assert!((d.xmin - 135.0).abs() < 1e-3);
        assert!((d.xmax - 185.0).abs() < 1e-3);
        assert!((d.ymin - 110.0).abs() < 1e-3);
        assert!((d.ymax - 210.0).abs() < 1e-3);
        assert!((d.confidence - 0.81).abs() < 1e-4);
    }

    #[test]
    fn test_decode_suppresses_duplicate_boxes() {
        let mut raw = row(320.0, 320.0, 100.0, 100.0, 0.9, 0, 0.9);
        raw.extend(row(322.0, 321.0, 100.0, 100.0, 0.8, 0, 0.9));
        let dets = decode(&raw, 0.6, 640.0, 640.0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].name, "person");
    }

    #[test]
    fn test_decode_keeps_distinct_classes() {
        let mut raw = row(100.0, 100.0, 50.0, 50.0, 0.9, 0, 0.9);
        raw.extend(row(500.0, 500.0, 50.0, 50.0, 0.9, 16, 0.9));
        let dets = decode(&raw, 0.6, 640.0, 640.0);
        assert_eq!(dets.len(), 2);
        let names: Vec<&str> = dets.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"person"));
        assert!(names.contains(&"dog"));
    }

    #[test]
    fn test_decode_clamps_to_image_bounds() {
        // Box centered near the origin spills past the edge.
        let raw = row(10.0, 10.0, 100.0, 100.0, 0.9, 0, 0.9);
        let dets = decode(&raw, 0.6, 640.0, 640.0);
        assert_eq!(dets.len(), 1);
        assert!(dets[0].xmin >= 0.0);
        assert!(dets[0].ymin >= 0.0);
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let image = RgbImage::from_pixel(100, 50, image::Rgb([255, 0, 128]));
        let tensor = preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, OBJ_INPUT_SIZE, OBJ_INPUT_SIZE]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 0, 0]].abs() < 1e-6);
    }
}
