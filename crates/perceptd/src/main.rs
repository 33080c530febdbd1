//! perceptd — vision inference daemon.
//!
//! Loads the local ONNX models, builds the face gallery from the media
//! directory, and serves the HTTP API. Model files are resolved under
//! PERCEPT_MODEL_DIR; a missing model is a startup failure, not a
//! runtime surprise.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use percept_core::FaceMatcher;
use percept_models::{
    ActivityRecognizer, ImageClassifier, ObjectDetector, OnnxFaceEmbedder, VlmClient,
};

mod config;
mod engine;
mod error;
mod handlers;
mod server;
mod storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::Config::from_env();
    tracing::info!(
        model_dir = %config.model_dir.display(),
        media_root = %config.media_root.display(),
        "perceptd starting"
    );

    let store = storage::MediaStore::new(config.media_root.clone());
    store
        .ensure_dirs()
        .context("creating media directories")?;

    let embedder = OnnxFaceEmbedder::load(
        &config.face_detector_path(),
        &config.face_encoder_path(),
    )
    .context("loading face models")?;
    let currency = ImageClassifier::load(&config.currency_model_path(), config.currency_labels())
        .context("loading currency model")?;
    let objects = ObjectDetector::load(
        &config.object_model_path(),
        config.object_confidence_threshold,
    )
    .context("loading object detection model")?;
    let activity = ActivityRecognizer::load(
        &config.activity_model_path(),
        &config.activity_labels_path(),
    )
    .context("loading activity model")?;

    if !percept_models::video::is_available() {
        tracing::warn!("ffmpeg not found; activity_recognition will fail");
    }

    let matcher = FaceMatcher {
        resize_factor: config.resize_factor,
        distance_threshold: config.distance_threshold,
    };

    let engine = engine::spawn_engine(
        engine::EngineModels {
            embedder: Box::new(embedder),
            currency,
            objects,
            activity,
        },
        store.faces_dir(),
        matcher,
    )
    .context("starting inference engine")?;

    if config.vlm_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; read_text and describe_image may be rejected upstream");
    }
    let vlm = VlmClient::new(&config.vlm_endpoint, config.vlm_api_key.clone())
        .context("building vision-language client")?;

    let state = server::AppState {
        engine,
        store,
        vlm: Arc::new(vlm),
        ocr_model: config.ocr_model.clone(),
        describe_model: config.describe_model.clone(),
        activity_frames: config.activity_frames,
    };

    let addr = config
        .listen_addr
        .parse()
        .context("parsing PERCEPT_LISTEN_ADDR")?;
    server::serve(addr, server::router(state, config.max_upload_bytes)).await
}
