//! YOLOv8 box detection via ONNX Runtime.
//!
//! One decoder serves both primary detectors: the COCO object model and the
//! single-class face model differ only in vocabulary and weights.

use std::path::PathBuf;
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use ndarray::Array;
use ort::session::Session;
use tracing::{debug, info};

use flens_models::BoundingBox;

use crate::backends::session::{create_session, image_to_tensor, run_session};
use crate::error::{VisionError, VisionResult};
use crate::providers::{BoxDetector, DetectionCandidate};

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Configuration for a YOLOv8-style box detector.
#[derive(Debug, Clone)]
pub struct BoxDetectorConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
    /// Trained class vocabulary
    pub class_names: Vec<String>,
    /// Backend name for logging
    pub name: &'static str,
}

impl BoxDetectorConfig {
    /// Config for the COCO object detection model.
    pub fn object(model_path: PathBuf, confidence_threshold: f32) -> Self {
        Self {
            model_path,
            confidence_threshold,
            nms_threshold: 0.45,
            input_size: 640,
            class_names: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
            name: "yolo-object",
        }
    }

    /// Config for the single-class face detection model.
    pub fn face(model_path: PathBuf, confidence_threshold: f32) -> Self {
        Self {
            model_path,
            confidence_threshold,
            nms_threshold: 0.45,
            input_size: 640,
            class_names: vec!["Face".to_string()],
            name: "yolo-face",
        }
    }
}

/// YOLOv8 detector backed by an ONNX Runtime session.
///
/// The session is non-reentrant and shared; all calls serialize on the
/// internal mutex.
pub struct OrtBoxDetector {
    session: Mutex<Session>,
    config: BoxDetectorConfig,
}

impl OrtBoxDetector {
    /// Load the model named by the config.
    pub fn new(config: BoxDetectorConfig) -> VisionResult<Self> {
        let session = Mutex::new(create_session(&config.model_path)?);
        info!(
            model_path = %config.model_path.display(),
            classes = config.class_names.len(),
            input_size = config.input_size,
            "box detector initialized"
        );
        Ok(Self { session, config })
    }

    /// Parse YOLOv8 output.
    ///
    /// Layout is `[1, 4 + C, N]`: per candidate a center-format box followed
    /// by one score per class.
    fn postprocess(
        &self,
        outputs: &[f32],
        frame_w: u32,
        frame_h: u32,
    ) -> VisionResult<Vec<DetectionCandidate>> {
        let num_classes = self.config.class_names.len();
        let num_features = 4 + num_classes;

        if outputs.is_empty() || outputs.len() % num_features != 0 {
            return Err(VisionError::inference(format!(
                "unexpected output size {} for {} features",
                outputs.len(),
                num_features
            )));
        }
        let num_boxes = outputs.len() / num_features;

        let output_array = Array::from_shape_vec((num_features, num_boxes), outputs.to_vec())
            .map_err(|e| VisionError::inference(format!("failed to reshape output: {e}")))?;
        let transposed = output_array.t();

        let input_size = self.config.input_size as f32;
        let scale_w = frame_w as f32 / input_size;
        let scale_h = frame_h as f32 / input_size;

        let mut candidates: Vec<DetectionCandidate> = Vec::new();

        for i in 0..num_boxes {
            let cx = transposed[[i, 0]];
            let cy = transposed[[i, 1]];
            let w = transposed[[i, 2]];
            let h = transposed[[i, 3]];

            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for c in 0..num_classes {
                let score = transposed[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }

            if best_score < self.config.confidence_threshold {
                continue;
            }

            // Center format -> pixel corners, clamped to the frame.
            let x1 = (((cx - w / 2.0) * scale_w).round() as i32).clamp(0, frame_w as i32 - 1);
            let y1 = (((cy - h / 2.0) * scale_h).round() as i32).clamp(0, frame_h as i32 - 1);
            let x2 = (((cx + w / 2.0) * scale_w).round() as i32).clamp(0, frame_w as i32 - 1);
            let y2 = (((cy + h / 2.0) * scale_h).round() as i32).clamp(0, frame_h as i32 - 1);

            let bbox = BoundingBox::new(x1, y1, x2, y2);
            // Degenerate boxes never leave the decoder.
            if !bbox.is_valid() {
                continue;
            }

            candidates.push(DetectionCandidate {
                bbox,
                confidence: best_score,
                class_id: best_class,
            });
        }

        Ok(non_maximum_suppression(
            candidates,
            self.config.nms_threshold,
        ))
    }
}

impl BoxDetector for OrtBoxDetector {
    fn detect(&self, frame: &DynamicImage) -> VisionResult<Vec<DetectionCandidate>> {
        let (frame_w, frame_h) = frame.dimensions();
        if frame_w == 0 || frame_h == 0 {
            return Ok(Vec::new());
        }

        let input = image_to_tensor(frame, self.config.input_size, self.config.input_size)?;
        let (_, outputs) = run_session(&self.session, input, &["output0", "output"])?;
        let detections = self.postprocess(&outputs, frame_w, frame_h)?;

        debug!(
            count = detections.len(),
            detector = self.config.name,
            "box detection completed"
        );
        Ok(detections)
    }

    fn class_name(&self, class_id: usize) -> &str {
        self.config
            .class_names
            .get(class_id)
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    fn name(&self) -> &'static str {
        self.config.name
    }
}

/// Class-aware non-maximum suppression.
fn non_maximum_suppression(
    mut detections: Vec<DetectionCandidate>,
    nms_threshold: f32,
) -> Vec<DetectionCandidate> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_id != detections[j].class_id {
                continue;
            }
            if detections[i].bbox.iou(&detections[j].bbox) > nms_threshold as f64 {
                suppressed[j] = true;
            }
        }
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x1: i32, y1: i32, x2: i32, y2: i32, conf: f32, class_id: usize) -> DetectionCandidate {
        DetectionCandidate {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence: conf,
            class_id,
        }
    }

    #[test]
    fn test_coco_classes() {
        assert_eq!(COCO_CLASSES[0], "person");
        assert_eq!(COCO_CLASSES[2], "car");
        assert_eq!(COCO_CLASSES.len(), 80);
    }

    #[test]
    fn test_config_variants() {
        let object = BoxDetectorConfig::object(PathBuf::from("m.onnx"), 0.5);
        assert_eq!(object.class_names.len(), 80);
        let face = BoxDetectorConfig::face(PathBuf::from("m.onnx"), 0.5);
        assert_eq!(face.class_names, vec!["Face".to_string()]);
        assert_eq!(face.input_size, 640);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let kept = non_maximum_suppression(
            vec![
                candidate(0, 0, 100, 100, 0.9, 0),
                candidate(5, 5, 105, 105, 0.8, 0),
                candidate(5, 5, 105, 105, 0.7, 2),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        // The overlapping box of a different class survives.
        assert_eq!(kept[1].class_id, 2);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let kept = non_maximum_suppression(
            vec![
                candidate(0, 0, 50, 50, 0.9, 0),
                candidate(100, 100, 150, 150, 0.8, 0),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let result = OrtBoxDetector::new(BoxDetectorConfig::face(
            PathBuf::from("/nonexistent/model.onnx"),
            0.5,
        ));
        assert!(matches!(result, Err(VisionError::ModelNotFound(_))));
    }
}
