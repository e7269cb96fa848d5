//! Model service traits consumed by the frame engine.
//!
//! Every model is a stateless service behind a shared handle. Handles are
//! non-reentrant: implementations own whatever serialization their runtime
//! needs (the ort backends keep their session behind a mutex); the engine
//! itself never locks.

use std::path::Path;

use image::DynamicImage;
use ndarray::{Array2, Array4};

use flens_models::{ActivityPrediction, BoundingBox};

use crate::error::VisionResult;

/// One primary-detector candidate for the current frame.
#[derive(Debug, Clone)]
pub struct DetectionCandidate {
    pub bbox: BoundingBox,
    /// Detection confidence (0.0-1.0).
    pub confidence: f32,
    /// Index into the detector's trained class vocabulary.
    pub class_id: usize,
}

/// Landmark representation kinds, named after the point layouts different
/// detector configurations expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkKind {
    /// Five points: left eye, right eye, nose, left mouth, right mouth.
    FivePoint,
    /// Dense 106-point layout.
    Dense106,
    /// Dense 68-point layout.
    Dense68,
}

/// One named landmark representation carried by a face record.
#[derive(Debug, Clone)]
pub struct LandmarkRepr {
    pub kind: LandmarkKind,
    /// Points in source-frame pixel coordinates; by convention point 0 is
    /// the left eye and point 1 the right eye.
    pub points: Vec<(f32, f32)>,
}

/// Per-face output of the secondary detector.
#[derive(Debug, Clone)]
pub struct FaceRecord {
    pub bbox: BoundingBox,
    /// Zero or more landmark representations; the extractor probes them in
    /// a fixed order.
    pub landmarks: Vec<LandmarkRepr>,
    /// Gender score in [0, 1], toward 1.0 for male.
    pub gender: Option<f32>,
}

/// One labeled probability from the emotion estimator.
#[derive(Debug, Clone)]
pub struct EmotionScore {
    pub label: String,
    pub probability: f32,
}

/// Primary detector: fast box-only locator producing candidate regions.
pub trait BoxDetector: Send + Sync {
    /// Detect candidate boxes in a frame, in the detector's native order.
    /// Degenerate boxes never appear in the output.
    fn detect(&self, frame: &DynamicImage) -> VisionResult<Vec<DetectionCandidate>>;

    /// Display label for a class id from the trained vocabulary.
    fn class_name(&self, class_id: usize) -> &str;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Secondary detector: richer per-face analyzer producing landmarks and a
/// gender signal, run once per frame and matched post-hoc to primary boxes.
pub trait FaceAttributeDetector: Send + Sync {
    fn analyze(&self, frame: &DynamicImage) -> VisionResult<Vec<FaceRecord>>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Age estimator over normalized RGB batches.
pub trait AgeEstimator: Send + Sync {
    /// Run the estimator on an `(N, 3, S, S)` batch with values in [0, 1],
    /// where `S` is [`Self::input_size`].
    ///
    /// Returns `(N, 1)` for regression heads or `(N, bins)` for
    /// classification heads.
    fn predict(&self, batch: Array4<f32>) -> VisionResult<Array2<f32>>;

    /// Square spatial input size the batch must be resized to.
    fn input_size(&self) -> u32;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Emotion estimator over a single face crop.
pub trait EmotionEstimator: Send + Sync {
    /// Score emotions for an in-memory face crop.
    fn detect_image(&self, image: &DynamicImage) -> VisionResult<Vec<EmotionScore>>;

    /// Score emotions for a crop previously written to disk; backends that
    /// only accept file input implement this and reject `detect_image`.
    fn detect_path(&self, path: &Path) -> VisionResult<Vec<EmotionScore>>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Whole-clip activity classifier.
pub trait ActivityRecognizer: Send + Sync {
    /// Classify a clip of decoded frames; implementations define the
    /// minimum clip length.
    fn classify(&self, frames: &[DynamicImage]) -> VisionResult<ActivityPrediction>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
