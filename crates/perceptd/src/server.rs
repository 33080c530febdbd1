//! HTTP surface of the daemon.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::EngineHandle;
use crate::handlers;
use crate::storage::MediaStore;
use percept_models::VlmClient;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub store: MediaStore,
    pub vlm: Arc<VlmClient>,
    pub ocr_model: String,
    pub describe_model: String,
    pub activity_frames: usize,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/detect_currency", post(handlers::detect_currency))
        .route("/object_detection", post(handlers::object_detection))
        .route("/add_face", post(handlers::add_face))
        .route("/recognize_face", post(handlers::recognize_face))
        .route("/read_text", post(handlers::read_text))
        .route("/activity_recognition", post(handlers::activity_recognition))
        .route("/describe_image", post(handlers::describe_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
