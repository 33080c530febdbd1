//! Request handlers for the vision endpoints.

use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::server::AppState;
use crate::storage;

/// One uploaded file pulled out of a multipart body.
struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Read the first `file` field from the multipart body.
async fn read_file_field(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(|c| c.to_string());
        let bytes = field.bytes().await?.to_vec();
        return Ok(Upload {
            filename,
            content_type,
            bytes,
        });
    }
    Err(ApiError::MissingFile)
}

fn decode_image(bytes: &[u8]) -> Result<image::RgbImage, ApiError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| ApiError::InvalidImage(e.to_string()))
}

/// Best-effort MIME type for the vision-service data URL.
fn image_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::WebP) => "image/webp",
        _ => "image/jpeg",
    }
}

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let gallery_size = state.engine.gallery_size().await?;
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "gallery_size": gallery_size,
    })))
}

pub async fn detect_currency(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_file_field(&mut multipart).await?;
    let path = state.store.save_upload(&upload.filename, &upload.bytes)?;
    tracing::info!(path = %path.display(), "currency image received");

    let image = decode_image(&upload.bytes)?;
    let prediction = state.engine.classify_currency(image).await?;
    Ok(Json(json!({ "predicted_currency": prediction.label })))
}

pub async fn object_detection(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_file_field(&mut multipart).await?;
    let path = state.store.save_upload(&upload.filename, &upload.bytes)?;
    tracing::info!(path = %path.display(), "object detection image received");

    let image = decode_image(&upload.bytes)?;
    let detections = state.engine.detect_objects(image).await?;
    Ok(Json(json!({ "detected_objects": detections })))
}

/// Enroll reference photos for one person, then rebuild the gallery so
/// the new face is matchable immediately.
pub async fn add_face(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut name: Option<String> = None;
    let mut files: Vec<Upload> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("name") => name = Some(field.text().await?),
            Some("files") => {
                let filename = field.file_name().unwrap_or("face").to_string();
                let content_type = field.content_type().map(|c| c.to_string());
                let bytes = field.bytes().await?.to_vec();
                files.push(Upload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let name = name.ok_or(ApiError::MissingField("name"))?;
    let name = storage::validate_name(&name).ok_or(ApiError::InvalidName)?;
    if files.is_empty() {
        return Err(ApiError::NoImages);
    }
    for upload in &files {
        match upload.content_type.as_deref() {
            Some("image/jpeg") | Some("image/png") => {}
            other => {
                return Err(ApiError::InvalidFileType(
                    other.unwrap_or("unknown").to_string(),
                ))
            }
        }
    }

    for upload in &files {
        let path = state
            .store
            .save_face(&name, &upload.filename, &upload.bytes)?;
        tracing::info!(name = %name, path = %path.display(), "face image saved");
    }

    let entries = state.engine.reload_gallery(state.store.faces_dir()).await?;
    tracing::info!(name = %name, entries, "gallery reloaded");

    Ok(Json(json!({
        "message": format!("Face added successfully for {name}")
    })))
}

pub async fn recognize_face(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_file_field(&mut multipart).await?;
    let path = state.store.save_upload(&upload.filename, &upload.bytes)?;
    tracing::info!(path = %path.display(), "recognition frame received");

    let frame = decode_image(&upload.bytes)?;
    let matches = state.engine.recognize_faces(frame).await?;
    Ok(Json(json!({ "recognized_faces": matches })))
}

pub async fn read_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_file_field(&mut multipart).await?;
    let mime = image_mime(&upload.bytes);

    let text = state
        .vlm
        .extract_text(&state.ocr_model, &upload.bytes, mime)
        .await?;
    Ok(Json(json!({ "extracted_text": text })))
}

pub async fn activity_recognition(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_file_field(&mut multipart).await?;
    let path = state.store.save_upload(&upload.filename, &upload.bytes)?;
    tracing::info!(path = %path.display(), "video clip received");

    // Frame extraction shells out to ffmpeg; keep it off the runtime.
    let max_frames = state.activity_frames;
    let frames = tokio::task::spawn_blocking(move || {
        percept_models::extract_frames(&path, max_frames, 224)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let prediction = state.engine.recognize_activity(frames).await?;
    Ok(Json(json!({
        "predicted_activity": prediction.label,
        "confidence": prediction.confidence,
    })))
}

pub async fn describe_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_file_field(&mut multipart).await?;
    let path = state.store.save_upload(&upload.filename, &upload.bytes)?;
    tracing::info!(path = %path.display(), "description image received");

    let mime = image_mime(&upload.bytes);
    let description = state
        .vlm
        .describe(&state.describe_model, &upload.bytes, mime)
        .await?;
    Ok(Json(json!({ "description": description })))
}
