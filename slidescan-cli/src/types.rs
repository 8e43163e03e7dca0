//! Shared types and conversions for slidescan-cli.

use serde::Serialize;
use slidescan_core::DetectionCandidate;

/// A serializable representation of a single detection.
#[derive(Debug, Serialize)]
pub struct DetectionRecord {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

/// A serializable representation of all detections for a single image.
#[derive(Debug, Serialize)]
pub struct ImageDetections {
    pub image: String,
    pub detections: Vec<DetectionRecord>,
    /// Number of candidates before suppression.
    pub raw_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_raw: Option<String>,
}

impl From<&DetectionCandidate> for DetectionRecord {
    fn from(candidate: &DetectionCandidate) -> Self {
        Self {
            x: candidate.x,
            y: candidate.y,
            width: candidate.width,
            height: candidate.height,
            confidence: candidate.confidence,
        }
    }
}
