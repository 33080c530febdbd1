//! API error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;
use percept_models::{VideoError, VlmError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("no file uploaded")]
    MissingFile,
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("no images provided")]
    NoImages,
    #[error("invalid name")]
    InvalidName,
    #[error("invalid file type: {0}")]
    InvalidFileType(String),
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("invalid multipart request: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("vision service: {0}")]
    Vlm(#[from] VlmError),
    #[error("video processing: {0}")]
    Video(#[from] VideoError),
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFile
            | ApiError::MissingField(_)
            | ApiError::NoImages
            | ApiError::InvalidName
            | ApiError::InvalidFileType(_)
            | ApiError::InvalidImage(_)
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::Vlm(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_)
            | ApiError::Engine(_)
            | ApiError::Video(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
