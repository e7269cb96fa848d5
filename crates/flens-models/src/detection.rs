//! Wire-level detection result types.
//!
//! Field names match the JSON the frontend consumes: flat pixel corners plus
//! confidence, label, and display color per detection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Display color serialized as an `[r, g, b]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// One labeled detection in a frame.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// Detector confidence (0.0-1.0).
    pub conf: f32,
    /// Display label; in face mode the composite `"{gender}, {age}, {emotion}"`.
    pub label: String,
    pub color: Rgb,
}

impl Detection {
    /// Create a detection from a bounding box.
    pub fn new(bbox: BoundingBox, conf: f32, label: impl Into<String>, color: Rgb) -> Self {
        Self {
            x1: bbox.x1,
            y1: bbox.y1,
            x2: bbox.x2,
            y2: bbox.y2,
            conf,
            label: label.into(),
            color,
        }
    }

    /// The detection's bounding box.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x1, self.y1, self.x2, self.y2)
    }
}

/// Response body for single-frame detection endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectionsResponse {
    pub detections: Vec<Detection>,
}

/// Detections for one sampled frame of a video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoFrameDetections {
    /// Index of the frame in the source video.
    pub frame: u64,
    pub detections: Vec<Detection>,
}

/// Result of the activity-recognition video mode.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivityPrediction {
    pub predicted_class_id: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One entry in a video processing response.
///
/// Untagged: per-frame detection entries and the single activity entry share
/// the `results` array, as the frontend expects.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum VideoResultEntry {
    Frame(VideoFrameDetections),
    Activity(ActivityPrediction),
}

/// Response body for the video processing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoResponse {
    pub results: Vec<VideoResultEntry>,
}
