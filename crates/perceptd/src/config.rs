use std::path::PathBuf;

/// Output-index-to-denomination order of the currency model head.
const CURRENCY_LABELS: [&str; 7] = ["10", "100", "20", "200", "2000", "50", "500"];

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Listen address (default: 127.0.0.1:8000).
    pub listen_addr: String,
    /// Root directory for `faces/` and `uploads/`.
    pub media_root: PathBuf,
    /// Directory containing ONNX model files and label lists.
    pub model_dir: PathBuf,
    /// Maximum Euclidean distance for a positive face match.
    pub distance_threshold: f32,
    /// Linear downscale applied to query frames before face detection.
    pub resize_factor: f32,
    /// Minimum confidence for a reported object detection.
    pub object_confidence_threshold: f32,
    /// Leading frames taken from an uploaded video clip.
    pub activity_frames: usize,
    /// Multipart body size cap in bytes.
    pub max_upload_bytes: usize,
    /// OpenAI-compatible vision endpoint.
    pub vlm_endpoint: String,
    /// Bearer token for the vision endpoint, from OPENAI_API_KEY.
    pub vlm_api_key: Option<String>,
    /// Model used for text extraction.
    pub ocr_model: String,
    /// Model used for image description.
    pub describe_model: String,
}

impl Config {
    /// Load configuration from `PERCEPT_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("PERCEPT_LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            media_root: std::env::var("PERCEPT_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./media")),
            model_dir: std::env::var("PERCEPT_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models")),
            distance_threshold: env_f32(
                "PERCEPT_DISTANCE_THRESHOLD",
                percept_core::DEFAULT_DISTANCE_THRESHOLD,
            ),
            resize_factor: env_f32("PERCEPT_RESIZE_FACTOR", percept_core::DEFAULT_RESIZE_FACTOR),
            object_confidence_threshold: env_f32(
                "PERCEPT_OBJECT_CONFIDENCE",
                percept_models::objects::DEFAULT_OBJECT_CONFIDENCE,
            ),
            activity_frames: env_usize("PERCEPT_ACTIVITY_FRAMES", 100),
            max_upload_bytes: env_usize("PERCEPT_MAX_UPLOAD_BYTES", 25 * 1024 * 1024),
            vlm_endpoint: std::env::var("PERCEPT_VLM_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            vlm_api_key: std::env::var("OPENAI_API_KEY").ok(),
            ocr_model: std::env::var("PERCEPT_OCR_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            describe_model: std::env::var("PERCEPT_DESCRIBE_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }

    pub fn face_detector_path(&self) -> String {
        self.model_path("face_detector.onnx")
    }

    pub fn face_encoder_path(&self) -> String {
        self.model_path("face_encoder.onnx")
    }

    pub fn currency_model_path(&self) -> String {
        self.model_path("currency_mobilenetv2.onnx")
    }

    pub fn object_model_path(&self) -> String {
        self.model_path("yolov5l.onnx")
    }

    pub fn activity_model_path(&self) -> String {
        self.model_path("movinet_a2.onnx")
    }

    pub fn activity_labels_path(&self) -> String {
        self.model_path("kinetics_600_labels.csv")
    }

    pub fn currency_labels(&self) -> Vec<String> {
        CURRENCY_LABELS.iter().map(|l| l.to_string()).collect()
    }

    fn model_path(&self, file: &str) -> String {
        self.model_dir.join(file).to_string_lossy().into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
