use serde::{Deserialize, Serialize};

/// Label assigned to faces that match no gallery entry.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Bounding box for a detected face, in the coordinate frame of the
/// image it was detected in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl BoundingBox {
    /// Map this box from a frame downscaled by `factor` back to
    /// original-frame integer pixel coordinates.
    pub fn rescale(&self, factor: f32) -> PixelRect {
        PixelRect {
            x: (self.x / factor).round() as i32,
            y: (self.y / factor).round() as i32,
            width: (self.width / factor).round() as i32,
            height: (self.height / factor).round() as i32,
        }
    }
}

/// Integer pixel rectangle in original-frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Face encoding vector produced by the embedding model. Opaque to the
/// gallery beyond supporting a Euclidean distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    /// Euclidean distance between two encodings.
    pub fn euclidean_distance(&self, other: &Encoding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A named reference encoding.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub name: String,
    pub encoding: Encoding,
}

/// Ordered set of reference encodings.
///
/// Insertion order is significant only as the tie-break on equal
/// distances: the earliest inserted entry wins. Names are not unique —
/// multiple reference photos per person are expected.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn push(&mut self, entry: GalleryEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Index and distance of the entry nearest to `probe`, or `None`
    /// for an empty gallery. Ties go to the earliest insertion.
    pub fn best_match(&self, probe: &Encoding) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            let dist = probe.euclidean_distance(&entry.encoding);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((i, dist));
            }
        }
        best
    }
}

/// One recognized face in a query frame.
#[derive(Debug, Clone, Serialize)]
pub struct FaceMatch {
    #[serde(rename = "box")]
    pub rect: PixelRect,
    pub name: String,
}
