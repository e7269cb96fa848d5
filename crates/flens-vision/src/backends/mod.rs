//! ONNX Runtime implementations of the model service traits.

mod activity;
mod age;
mod emotion;
mod face_attr;
mod session;
mod yolo;

pub use activity::OrtActivityRecognizer;
pub use age::OrtAgeEstimator;
pub use emotion::{OrtEmotionEstimator, EMOTION_LABELS};
pub use face_attr::{FaceAttributeConfig, OrtFaceAttributeDetector};
pub use yolo::{BoxDetectorConfig, OrtBoxDetector, COCO_CLASSES};
