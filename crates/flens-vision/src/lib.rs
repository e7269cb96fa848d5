//! Detection fusion, face alignment, and attribute inference for FrameLens.
//!
//! This crate provides:
//! - Greedy cross-detector fusion of two independent face detectors
//! - Landmark-driven face alignment (eye leveling with edge-replicating
//!   rotation)
//! - The age / gender / emotion attribute cascade with sentinel degradation
//! - FFmpeg-based video frame sampling and activity-clip extraction
//! - ONNX Runtime model backends behind the service traits

pub mod align;
pub mod attributes;
pub mod backends;
pub mod config;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod fusion;
pub mod landmarks;
pub mod providers;
pub mod video;

pub use backends::{
    BoxDetectorConfig, FaceAttributeConfig, OrtActivityRecognizer, OrtAgeEstimator,
    OrtBoxDetector, OrtEmotionEstimator, OrtFaceAttributeDetector, COCO_CLASSES, EMOTION_LABELS,
};
pub use config::EngineConfig;
pub use engine::FrameEngine;
pub use error::{VisionError, VisionResult};
pub use ffmpeg::{check_ffmpeg, check_ffprobe, probe_video, VideoInfo};
pub use fusion::{best_matched_record, FusionMatch, DEFAULT_MATCH_THRESHOLD};
pub use landmarks::extract_landmarks;
pub use providers::{
    ActivityRecognizer, AgeEstimator, BoxDetector, DetectionCandidate, EmotionEstimator,
    EmotionScore, FaceAttributeDetector, FaceRecord, LandmarkKind, LandmarkRepr,
};
pub use video::{classify_activity, detect_in_video, ACTIVITY_CLIP_FRAMES};
