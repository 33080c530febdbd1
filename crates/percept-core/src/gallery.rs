//! Gallery loader.
//!
//! Builds a named gallery from a directory of reference images named
//! `<name>_<suffix>.<ext>`. Unreadable and face-less images are logged
//! and skipped; the loader only aborts when the directory itself cannot
//! be read or the embedding model fails.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::embedder::{EmbedderError, FaceEmbedder};
use crate::types::{Gallery, GalleryEntry};

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery directory {path}: {source}")]
    DirUnreadable {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Embedder(#[from] EmbedderError),
}

/// Derive the gallery name for a reference image file: the filename
/// stem up to the first `_`. `alice_1.jpg` → `alice`, `bob.png` → `bob`.
fn name_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(stem.split('_').next().unwrap_or(stem).to_string())
}

/// Scan `dir` (non-recursive, any extension) and build a gallery from
/// every readable image that contains at least one face.
///
/// When an image holds several faces, only the first encoding the
/// embedder returns is enrolled. Callers replace their previous gallery
/// with the returned one in a single assignment, so readers never see a
/// partially rebuilt gallery.
pub fn load_gallery(dir: &Path, embedder: &mut dyn FaceEmbedder) -> Result<Gallery, GalleryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| GalleryError::DirUnreadable {
        path: dir.display().to_string(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    // read_dir order is platform-defined; sort so repeated loads of an
    // unchanged directory produce the same insertion order.
    files.sort();

    tracing::info!(dir = %dir.display(), count = files.len(), "reference images found");

    let mut gallery = Gallery::default();

    for path in &files {
        let img = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "image could not be read, skipping");
                continue;
            }
        };

        let Some(name) = name_from_path(path) else {
            tracing::warn!(path = %path.display(), "filename is not valid UTF-8, skipping");
            continue;
        };

        let boxes = embedder.detect_faces(&img)?;
        if boxes.is_empty() {
            tracing::warn!(path = %path.display(), "no faces found, keeping file for future processing");
            continue;
        }

        let encodings = embedder.compute_encodings(&img, &boxes)?;
        let Some(encoding) = encodings.into_iter().next() else {
            tracing::warn!(path = %path.display(), "embedder returned no encodings, skipping");
            continue;
        };

        gallery.push(GalleryEntry { name, encoding });
    }

    tracing::info!(entries = gallery.len(), "gallery loaded");
    Ok(gallery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{solid_image, FailingEmbedder, PixelEmbedder, StubEmbedder};
    use crate::types::{BoundingBox, Encoding};
    use tempfile::TempDir;

    #[test]
    fn test_name_from_path_with_suffix() {
        assert_eq!(
            name_from_path(Path::new("/faces/bob_2.png")).as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn test_name_from_path_without_underscore() {
        assert_eq!(
            name_from_path(Path::new("/faces/bob.png")).as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn test_name_from_path_multiple_underscores() {
        assert_eq!(
            name_from_path(Path::new("alice_photo_1.jpg")).as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_load_gallery_end_to_end() {
        let dir = TempDir::new().unwrap();
        solid_image(16, 16, [200, 10, 10])
            .save(dir.path().join("alice_1.png"))
            .unwrap();
        solid_image(16, 16, [201, 10, 10])
            .save(dir.path().join("alice_2.png"))
            .unwrap();
        solid_image(16, 16, [0, 0, 0])
            .save(dir.path().join("noface.png"))
            .unwrap();
        std::fs::write(dir.path().join("corrupt.jpg"), b"definitely not an image").unwrap();

        let gallery = load_gallery(dir.path(), &mut PixelEmbedder).unwrap();

        assert_eq!(gallery.len(), 2);
        assert!(gallery.entries().iter().all(|e| e.name == "alice"));
    }

    #[test]
    fn test_load_gallery_skips_faceless_but_continues() {
        let dir = TempDir::new().unwrap();
        // Sorted order puts the face-less image first; the loader must
        // still process the later file.
        solid_image(8, 8, [0, 0, 0])
            .save(dir.path().join("a_noface.png"))
            .unwrap();
        solid_image(8, 8, [50, 60, 70])
            .save(dir.path().join("zoe_1.png"))
            .unwrap();

        let gallery = load_gallery(dir.path(), &mut PixelEmbedder).unwrap();

        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.entries()[0].name, "zoe");
    }

    #[test]
    fn test_load_gallery_idempotent() {
        let dir = TempDir::new().unwrap();
        solid_image(8, 8, [10, 20, 30])
            .save(dir.path().join("carol_1.png"))
            .unwrap();
        solid_image(8, 8, [40, 50, 60])
            .save(dir.path().join("dave_1.png"))
            .unwrap();

        let first = load_gallery(dir.path(), &mut PixelEmbedder).unwrap();
        let second = load_gallery(dir.path(), &mut PixelEmbedder).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.entries().iter().zip(second.entries()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.encoding, b.encoding);
        }
    }

    #[test]
    fn test_load_gallery_takes_first_encoding_only() {
        let dir = TempDir::new().unwrap();
        solid_image(8, 8, [1, 1, 1])
            .save(dir.path().join("eve_1.png"))
            .unwrap();

        let bbox = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 4.0,
            height: 4.0,
            confidence: 1.0,
        };
        let mut embedder = StubEmbedder {
            boxes: vec![bbox.clone(), bbox],
            encodings: vec![
                Encoding {
                    values: vec![1.0, 0.0],
                },
                Encoding {
                    values: vec![0.0, 1.0],
                },
            ],
        };

        let gallery = load_gallery(dir.path(), &mut embedder).unwrap();

        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.entries()[0].encoding.values, vec![1.0, 0.0]);
    }

    #[test]
    fn test_load_gallery_propagates_embedder_errors() {
        let dir = TempDir::new().unwrap();
        solid_image(8, 8, [1, 1, 1])
            .save(dir.path().join("mallory_1.png"))
            .unwrap();

        let result = load_gallery(dir.path(), &mut FailingEmbedder);
        assert!(matches!(result, Err(GalleryError::Embedder(_))));
    }

    #[test]
    fn test_load_gallery_missing_directory() {
        let result = load_gallery(Path::new("/nonexistent/faces"), &mut PixelEmbedder);
        assert!(matches!(result, Err(GalleryError::DirUnreadable { .. })));
    }

    #[test]
    fn test_load_gallery_empty_directory() {
        let dir = TempDir::new().unwrap();
        let gallery = load_gallery(dir.path(), &mut PixelEmbedder).unwrap();
        assert!(gallery.is_empty());
    }
}
