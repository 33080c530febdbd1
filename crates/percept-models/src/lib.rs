//! percept-models — model backends for the percept daemon.
//!
//! Local ONNX sessions (face embedding, image classification, object
//! detection, activity recognition), the remote vision-language client,
//! and ffmpeg-based video frame extraction. Every local model is an
//! opaque "image in, predictions out" box as far as the rest of the
//! system is concerned.

pub mod activity;
pub mod classifier;
pub mod face;
mod nms;
pub mod objects;
pub mod video;
pub mod vlm;

pub use activity::{ActivityError, ActivityRecognizer};
pub use classifier::{Classification, ClassifierError, ImageClassifier};
pub use face::{FaceModelError, OnnxFaceEmbedder};
pub use objects::{Detection, ObjectDetector, ObjectsError};
pub use video::{extract_frames, VideoError};
pub use vlm::{VlmClient, VlmError};
