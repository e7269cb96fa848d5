//! Shared data models for the FrameLens backend.
//!
//! Everything that crosses a crate or wire boundary lives here: bounding-box
//! geometry, detection result types, mode enums, the display palette, and
//! the WebSocket stream envelope.

pub mod detection;
pub mod geometry;
pub mod mode;
pub mod palette;
pub mod ws;

pub use detection::{
    ActivityPrediction, Detection, DetectionsResponse, Rgb, VideoFrameDetections, VideoResponse,
    VideoResultEntry,
};
pub use geometry::BoundingBox;
pub use mode::{DetectMode, ModeParseError, VideoMode};
pub use palette::{object_class_color, FACE_COLOR};
pub use ws::StreamMessage;
