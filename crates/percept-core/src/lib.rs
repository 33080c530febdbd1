//! percept-core — Face gallery and matcher.
//!
//! Maintains a named in-memory gallery of reference face encodings and
//! matches probe frames against it by nearest Euclidean distance. The
//! embedding model itself is external, behind the [`FaceEmbedder`] trait.

pub mod embedder;
pub mod gallery;
pub mod matcher;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use embedder::{EmbedderError, FaceEmbedder};
pub use gallery::{load_gallery, GalleryError};
pub use matcher::{FaceMatcher, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_RESIZE_FACTOR};
pub use types::{
    BoundingBox, Encoding, FaceMatch, Gallery, GalleryEntry, PixelRect, UNKNOWN_NAME,
};
