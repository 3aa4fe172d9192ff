//! Detection contracts between the external person detector and the
//! crowd analytics core.
//!
//! One [`DetectionRecord`] is produced per frame. Records are immutable once
//! created and are delivered in strictly increasing `frame_index` order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Centroid of a detected person in pixel coordinates.
///
/// Serialized as a `[x, y]` pair to match the detector's output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another centroid
    pub fn distance(&self, other: &Centroid) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<(f64, f64)> for Centroid {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Centroid> for (f64, f64) {
    fn from(c: Centroid) -> Self {
        (c.x, c.y)
    }
}

/// Frame dimensions as reported by the detector, serialized as `[height, width]`.
///
/// Dimensions are signed so that a bogus negative shape reaches density
/// scoring and is rejected there as an invalid shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct ImageShape {
    pub height: i64,
    pub width: i64,
}

impl ImageShape {
    pub fn new(height: i64, width: i64) -> Self {
        Self { height, width }
    }

    /// Pixel area of the frame; 0 when either dimension is not positive
    pub fn area(&self) -> i64 {
        if self.height <= 0 || self.width <= 0 {
            return 0;
        }
        self.height.saturating_mul(self.width)
    }
}

impl From<(i64, i64)> for ImageShape {
    fn from((height, width): (i64, i64)) -> Self {
        Self { height, width }
    }
}

impl From<ImageShape> for (i64, i64) {
    fn from(s: ImageShape) -> Self {
        (s.height, s.width)
    }
}

/// Per-frame output of the person detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Zero-based frame position in the source stream
    pub frame_index: u64,

    /// Frame timestamp in seconds from the start of the stream
    pub timestamp: f64,

    /// Number of detected persons
    pub person_count: u32,

    /// Person centroids, one per detection
    #[serde(default)]
    pub centroids: Vec<Centroid>,

    /// Detection confidences in [0, 1], one per detection
    #[serde(default)]
    pub confidences: Vec<f64>,

    /// Frame dimensions (height, width)
    pub image_shape: ImageShape,

    /// Source image or frame label (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,

    /// Person bounding boxes as (x1, y1, x2, y2); carried through untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bboxes: Vec<[f64; 4]>,
}

impl DetectionRecord {
    /// Label used for this frame in tabular artifacts
    pub fn frame_id(&self) -> String {
        self.image_id
            .clone()
            .unwrap_or_else(|| format!("frame_{:06}", self.frame_index))
    }

    /// Mean detection confidence, 0.0 when nothing was detected
    pub fn mean_confidence(&self) -> f64 {
        if self.confidences.is_empty() {
            return 0.0;
        }
        self.confidences.iter().sum::<f64>() / self.confidences.len() as f64
    }

    /// Check the record's internal consistency
    pub fn validate(&self) -> Result<(), DetectionError> {
        crate::validation::validate_detection(self)
    }
}

/// Reasons a detection record is rejected as malformed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error("frame {frame_index}: person_count is {expected} but {actual} centroids were supplied")]
    CentroidCountMismatch {
        frame_index: u64,
        expected: usize,
        actual: usize,
    },

    #[error("frame {frame_index}: person_count is {expected} but {actual} confidences were supplied")]
    ConfidenceCountMismatch {
        frame_index: u64,
        expected: usize,
        actual: usize,
    },

    #[error("frame {frame_index}: confidence {value} is outside [0, 1]")]
    ConfidenceOutOfRange { frame_index: u64, value: f64 },

    #[error("frame {frame_index}: non-finite value in {field}")]
    NonFinite {
        frame_index: u64,
        field: &'static str,
    },

    #[error("unparsable detection record: {0}")]
    Unparsable(String),
}
