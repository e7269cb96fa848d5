//! Engine and model configuration.

use std::path::PathBuf;

/// Configuration for the frame engine and its model backends.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// YOLOv8 object detection model (COCO vocabulary).
    pub object_model_path: PathBuf,
    /// YOLOv8 face detection model (single "Face" class).
    pub face_model_path: PathBuf,
    /// Secondary face detector (boxes + landmarks + gender).
    pub face_attribute_model_path: PathBuf,
    /// Age estimation model.
    pub age_model_path: PathBuf,
    /// Emotion classification model.
    pub emotion_model_path: PathBuf,
    /// Activity recognition model (16-frame clip classifier).
    pub activity_model_path: PathBuf,
    /// Optional newline-separated labels for activity classes.
    pub activity_labels_path: Option<PathBuf>,
    /// Confidence threshold for the primary detectors.
    pub primary_confidence: f32,
    /// Minimum IoU for a secondary record to count as a fusion match.
    pub fusion_iou_threshold: f64,
    /// Box expansion applied before cropping a face.
    pub expand_scale: f64,
    /// Process every Nth frame of an uploaded video.
    pub frame_stride: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            object_model_path: PathBuf::from("models/object_detection/yolov8n.onnx"),
            face_model_path: PathBuf::from("models/face_detection/yolov8n-face.onnx"),
            face_attribute_model_path: PathBuf::from("models/face_attributes/face_attributes.onnx"),
            age_model_path: PathBuf::from("models/age/age_resnet50.onnx"),
            emotion_model_path: PathBuf::from("models/emotion/emotion_fer.onnx"),
            activity_model_path: PathBuf::from("models/activity/r2plus1d_18.onnx"),
            activity_labels_path: None,
            primary_confidence: 0.5,
            fusion_iou_threshold: 0.25,
            expand_scale: 1.25,
            frame_stride: 5,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            object_model_path: env_path("FLENS_OBJECT_MODEL", defaults.object_model_path),
            face_model_path: env_path("FLENS_FACE_MODEL", defaults.face_model_path),
            face_attribute_model_path: env_path(
                "FLENS_FACE_ATTRIBUTE_MODEL",
                defaults.face_attribute_model_path,
            ),
            age_model_path: env_path("FLENS_AGE_MODEL", defaults.age_model_path),
            emotion_model_path: env_path("FLENS_EMOTION_MODEL", defaults.emotion_model_path),
            activity_model_path: env_path("FLENS_ACTIVITY_MODEL", defaults.activity_model_path),
            activity_labels_path: std::env::var("FLENS_ACTIVITY_LABELS").ok().map(PathBuf::from),
            primary_confidence: env_parse("FLENS_PRIMARY_CONFIDENCE", defaults.primary_confidence),
            fusion_iou_threshold: env_parse(
                "FLENS_FUSION_IOU_THRESHOLD",
                defaults.fusion_iou_threshold,
            ),
            expand_scale: env_parse("FLENS_EXPAND_SCALE", defaults.expand_scale),
            frame_stride: env_parse("FLENS_FRAME_STRIDE", defaults.frame_stride),
        }
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
