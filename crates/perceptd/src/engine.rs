//! Inference engine running on a dedicated OS thread.
//!
//! All local model sessions and the face gallery live on one thread;
//! requests arrive over a channel and are answered through oneshot
//! replies. Serializing inference this way also makes gallery reloads
//! atomic from the handlers' point of view: a reload builds a complete
//! new gallery before it replaces the old one, so a concurrent match
//! sees either the previous gallery or the finished new one.

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use percept_core::{
    load_gallery, EmbedderError, FaceEmbedder, FaceMatch, FaceMatcher, GalleryError,
};
use percept_models::{
    ActivityError, ActivityRecognizer, Classification, ClassifierError, Detection,
    ImageClassifier, ObjectDetector, ObjectsError,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("gallery: {0}")]
    Gallery(#[from] GalleryError),
    #[error("face embedding: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("classification: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("object detection: {0}")]
    Objects(#[from] ObjectsError),
    #[error("activity recognition: {0}")]
    Activity(#[from] ActivityError),
    #[error("engine thread is gone")]
    ChannelClosed,
}

/// The local model backends the engine thread owns.
pub struct EngineModels {
    pub embedder: Box<dyn FaceEmbedder + Send>,
    pub currency: ImageClassifier,
    pub objects: ObjectDetector,
    pub activity: ActivityRecognizer,
}

enum EngineRequest {
    ReloadGallery {
        dir: PathBuf,
        reply: oneshot::Sender<Result<usize, EngineError>>,
    },
    RecognizeFaces {
        frame: RgbImage,
        reply: oneshot::Sender<Result<Vec<FaceMatch>, EngineError>>,
    },
    ClassifyCurrency {
        image: RgbImage,
        reply: oneshot::Sender<Result<Classification, EngineError>>,
    },
    DetectObjects {
        image: RgbImage,
        reply: oneshot::Sender<Result<Vec<Detection>, EngineError>>,
    },
    RecognizeActivity {
        frames: Vec<RgbImage>,
        reply: oneshot::Sender<Result<Classification, EngineError>>,
    },
    GallerySize {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Rebuild the gallery from `dir` and swap it in. Returns the new
    /// entry count.
    pub async fn reload_gallery(&self, dir: PathBuf) -> Result<usize, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::ReloadGallery { dir, reply })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn recognize_faces(&self, frame: RgbImage) -> Result<Vec<FaceMatch>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::RecognizeFaces { frame, reply })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn classify_currency(&self, image: RgbImage) -> Result<Classification, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::ClassifyCurrency { image, reply })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn detect_objects(&self, image: RgbImage) -> Result<Vec<Detection>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::DetectObjects { image, reply })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn recognize_activity(
        &self,
        frames: Vec<RgbImage>,
    ) -> Result<Classification, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::RecognizeActivity { frames, reply })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn gallery_size(&self) -> Result<usize, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::GallerySize { reply })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Load the initial gallery, then spawn the engine thread.
///
/// Gallery load failure here is fatal: a daemon that cannot read its
/// own faces directory should not come up half-working.
pub fn spawn_engine(
    mut models: EngineModels,
    faces_dir: PathBuf,
    matcher: FaceMatcher,
) -> Result<EngineHandle, EngineError> {
    let mut gallery = load_gallery(&faces_dir, models.embedder.as_mut())?;
    tracing::info!(
        entries = gallery.len(),
        dir = %faces_dir.display(),
        "initial gallery loaded"
    );

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("percept-engine".into())
        .spawn(move || {
            tracing::debug!("engine thread started");
            while let Some(request) = rx.blocking_recv() {
                match request {
                    EngineRequest::ReloadGallery { dir, reply } => {
                        let result = load_gallery(&dir, models.embedder.as_mut())
                            .map(|fresh| {
                                gallery = fresh;
                                gallery.len()
                            })
                            .map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                    EngineRequest::RecognizeFaces { frame, reply } => {
                        let result = matcher
                            .match_faces(&frame, &gallery, models.embedder.as_mut())
                            .map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                    EngineRequest::ClassifyCurrency { image, reply } => {
                        let result = models.currency.classify(&image).map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                    EngineRequest::DetectObjects { image, reply } => {
                        let result = models.objects.detect(&image).map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                    EngineRequest::RecognizeActivity { frames, reply } => {
                        let result = models
                            .activity
                            .recognize(&frames)
                            .map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                    EngineRequest::GallerySize { reply } => {
                        let _ = reply.send(gallery.len());
                    }
                }
            }
            tracing::debug!("engine thread exiting");
        })
        .map_err(|_| EngineError::ChannelClosed)?;

    Ok(EngineHandle { tx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_channel_reports_engine_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = EngineHandle { tx };
        let result = handle.gallery_size().await;
        assert!(matches!(result, Err(EngineError::ChannelClosed)));
    }
}
