//! Per-frame orchestration over the loaded model services.

use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use flens_models::{object_class_color, DetectMode, Detection, FACE_COLOR};

use crate::align::align_face;
use crate::attributes::{estimate_age, estimate_emotion, estimate_gender};
use crate::backends::{
    BoxDetectorConfig, FaceAttributeConfig, OrtAgeEstimator, OrtBoxDetector,
    OrtEmotionEstimator, OrtFaceAttributeDetector,
};
use crate::config::EngineConfig;
use crate::error::VisionResult;
use crate::fusion::best_matched_record;
use crate::providers::{AgeEstimator, BoxDetector, EmotionEstimator, FaceAttributeDetector};

/// Drives one frame through the object path or the face-fusion path.
///
/// Holds shared handles to the loaded model services; all per-frame state
/// is created fresh and dropped when the frame's result is assembled.
pub struct FrameEngine {
    object_detector: Arc<dyn BoxDetector>,
    face_detector: Arc<dyn BoxDetector>,
    face_attributes: Arc<dyn FaceAttributeDetector>,
    age: Arc<dyn AgeEstimator>,
    emotion: Arc<dyn EmotionEstimator>,
    config: EngineConfig,
}

impl FrameEngine {
    /// Assemble an engine from explicit model handles.
    pub fn new(
        object_detector: Arc<dyn BoxDetector>,
        face_detector: Arc<dyn BoxDetector>,
        face_attributes: Arc<dyn FaceAttributeDetector>,
        age: Arc<dyn AgeEstimator>,
        emotion: Arc<dyn EmotionEstimator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            object_detector,
            face_detector,
            face_attributes,
            age,
            emotion,
            config,
        }
    }

    /// Load the ort backends named by the config.
    pub fn from_config(config: EngineConfig) -> VisionResult<Self> {
        let object_detector = OrtBoxDetector::new(BoxDetectorConfig::object(
            config.object_model_path.clone(),
            config.primary_confidence,
        ))?;
        let face_detector = OrtBoxDetector::new(BoxDetectorConfig::face(
            config.face_model_path.clone(),
            config.primary_confidence,
        ))?;
        let face_attributes = OrtFaceAttributeDetector::new(FaceAttributeConfig::new(
            config.face_attribute_model_path.clone(),
        ))?;
        let age = OrtAgeEstimator::new(&config.age_model_path)?;
        let emotion = OrtEmotionEstimator::new(&config.emotion_model_path)?;

        Ok(Self::new(
            Arc::new(object_detector),
            Arc::new(face_detector),
            Arc::new(face_attributes),
            Arc::new(age),
            Arc::new(emotion),
            config,
        ))
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process one frame, returning detections in the primary detector's
    /// native order.
    pub fn process_frame(
        &self,
        frame: &DynamicImage,
        mode: DetectMode,
    ) -> VisionResult<Vec<Detection>> {
        match mode {
            DetectMode::Object => self.process_objects(frame),
            DetectMode::Face => self.process_faces(frame),
        }
    }

    fn process_objects(&self, frame: &DynamicImage) -> VisionResult<Vec<Detection>> {
        let candidates = self.object_detector.detect(frame)?;
        debug!(count = candidates.len(), "object detection complete");

        Ok(candidates
            .into_iter()
            .filter(|c| c.bbox.is_valid())
            .map(|c| {
                Detection::new(
                    c.bbox,
                    c.confidence,
                    self.object_detector.class_name(c.class_id),
                    object_class_color(c.class_id),
                )
            })
            .collect())
    }

    fn process_faces(&self, frame: &DynamicImage) -> VisionResult<Vec<Detection>> {
        let candidates = self.face_detector.detect(frame)?;
        let records = self.face_attributes.analyze(frame)?;
        debug!(
            faces = candidates.len(),
            records = records.len(),
            "face detection complete"
        );

        let rgb = frame.to_rgb8();
        let mut detections = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if !candidate.bbox.is_valid() {
                continue;
            }

            let matched =
                best_matched_record(&records, &candidate.bbox, self.config.fusion_iou_threshold);

            let Some(crop) = align_face(
                &rgb,
                matched.record,
                &candidate.bbox,
                self.config.expand_scale,
            ) else {
                debug!("skipping detection: empty crop");
                continue;
            };

            let age = estimate_age(self.age.as_ref(), &crop);
            let (gender, _gender_conf) = estimate_gender(matched.record, matched.best_iou);
            let (emotion, _emotion_conf) = estimate_emotion(self.emotion.as_ref(), &crop);

            let label = format!("{gender}, {age}, {emotion}");
            detections.push(Detection::new(
                candidate.bbox,
                candidate.confidence,
                label,
                FACE_COLOR,
            ));
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        DetectionCandidate, EmotionScore, FaceRecord, LandmarkKind, LandmarkRepr,
    };
    use flens_models::{BoundingBox, Rgb};
    use ndarray::{Array2, Array4};
    use std::path::Path;

    struct StubBoxes(Vec<DetectionCandidate>);

    impl BoxDetector for StubBoxes {
        fn detect(&self, _frame: &DynamicImage) -> VisionResult<Vec<DetectionCandidate>> {
            Ok(self.0.clone())
        }

        fn class_name(&self, class_id: usize) -> &str {
            match class_id {
                0 => "person",
                2 => "car",
                _ => "unknown",
            }
        }

        fn name(&self) -> &'static str {
            "stub-boxes"
        }
    }

    struct StubRecords(Vec<FaceRecord>);

    impl FaceAttributeDetector for StubRecords {
        fn analyze(&self, _frame: &DynamicImage) -> VisionResult<Vec<FaceRecord>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "stub-records"
        }
    }

    struct StubAge(f32);

    impl AgeEstimator for StubAge {
        fn predict(&self, batch: Array4<f32>) -> VisionResult<Array2<f32>> {
            Ok(Array2::from_elem((batch.dim().0, 1), self.0))
        }

        fn input_size(&self) -> u32 {
            64
        }

        fn name(&self) -> &'static str {
            "stub-age"
        }
    }

    struct StubEmotion(Vec<EmotionScore>);

    impl EmotionEstimator for StubEmotion {
        fn detect_image(&self, _image: &DynamicImage) -> VisionResult<Vec<EmotionScore>> {
            Ok(self.0.clone())
        }

        fn detect_path(&self, _path: &Path) -> VisionResult<Vec<EmotionScore>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "stub-emotion"
        }
    }

    fn engine(
        candidates: Vec<DetectionCandidate>,
        records: Vec<FaceRecord>,
    ) -> FrameEngine {
        FrameEngine::new(
            Arc::new(StubBoxes(candidates.clone())),
            Arc::new(StubBoxes(candidates)),
            Arc::new(StubRecords(records)),
            Arc::new(StubAge(31.0)),
            Arc::new(StubEmotion(vec![EmotionScore {
                label: "Happy".to_string(),
                probability: 0.85,
            }])),
            EngineConfig::default(),
        )
    }

    fn frame(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        }))
    }

    fn candidate(x1: i32, y1: i32, x2: i32, y2: i32, conf: f32) -> DetectionCandidate {
        DetectionCandidate {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence: conf,
            class_id: 0,
        }
    }

    #[test]
    fn test_object_mode_labels_and_colors() {
        let mut cars = candidate(5, 5, 50, 50, 0.8);
        cars.class_id = 2;
        let engine = engine(vec![candidate(0, 0, 40, 40, 0.9), cars], vec![]);

        let detections = engine
            .process_frame(&frame(200, 200), DetectMode::Object)
            .unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "person");
        assert_eq!(detections[1].label, "car");
        assert_ne!(detections[0].color, detections[1].color);
    }

    #[test]
    fn test_face_mode_full_cascade() {
        let record = FaceRecord {
            bbox: BoundingBox::new(10, 10, 110, 110),
            landmarks: vec![LandmarkRepr {
                kind: LandmarkKind::FivePoint,
                points: vec![
                    (40.0, 50.0),
                    (80.0, 50.0),
                    (60.0, 70.0),
                    (45.0, 90.0),
                    (75.0, 90.0),
                ],
            }],
            gender: Some(0.8),
        };
        let engine = engine(vec![candidate(10, 10, 110, 110, 0.9)], vec![record]);

        let detections = engine
            .process_frame(&frame(200, 200), DetectMode::Face)
            .unwrap();
        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.label, "Male, 31, Happy");
        assert!((det.conf - 0.9).abs() < 1e-6);
        assert_eq!(det.color, Rgb(0, 255, 0));
        assert_eq!(det.bbox(), BoundingBox::new(10, 10, 110, 110));
    }

    #[test]
    fn test_face_mode_without_matching_record() {
        // No overlapping record: crop falls back to the primary box and
        // gender is forced to N/A.
        let far_record = FaceRecord {
            bbox: BoundingBox::new(150, 150, 190, 190),
            landmarks: vec![],
            gender: Some(0.9),
        };
        let engine = engine(vec![candidate(10, 10, 110, 110, 0.9)], vec![far_record]);

        let detections = engine
            .process_frame(&frame(200, 200), DetectMode::Face)
            .unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "N/A, 31, Happy");
    }

    #[test]
    fn test_face_mode_tiny_crop_keeps_entry_with_sentinels() {
        // A 20-px face is below both attribute minimums but alignment
        // succeeds, so the entry is still emitted.
        let record = FaceRecord {
            bbox: BoundingBox::new(10, 10, 30, 30),
            landmarks: vec![],
            gender: Some(0.8),
        };
        let engine = engine(vec![candidate(10, 10, 30, 30, 0.7)], vec![record]);

        let detections = engine
            .process_frame(&frame(200, 200), DetectMode::Face)
            .unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "Male, N/A, Unknown");
    }

    #[test]
    fn test_face_mode_skips_unalignable_detection() {
        // A degenerate candidate box cannot produce a crop with scale 0.
        let engine = FrameEngine::new(
            Arc::new(StubBoxes(vec![])),
            Arc::new(StubBoxes(vec![candidate(10, 10, 110, 110, 0.9)])),
            Arc::new(StubRecords(vec![])),
            Arc::new(StubAge(31.0)),
            Arc::new(StubEmotion(vec![])),
            EngineConfig {
                expand_scale: 0.0,
                ..EngineConfig::default()
            },
        );

        let detections = engine
            .process_frame(&frame(200, 200), DetectMode::Face)
            .unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_output_preserves_detector_order() {
        let engine = engine(
            vec![
                candidate(100, 100, 180, 180, 0.6),
                candidate(10, 10, 90, 90, 0.95),
            ],
            vec![],
        );

        let detections = engine
            .process_frame(&frame(200, 200), DetectMode::Face)
            .unwrap();
        assert_eq!(detections.len(), 2);
        // No re-sorting by confidence.
        assert!((detections[0].conf - 0.6).abs() < 1e-6);
        assert!((detections[1].conf - 0.95).abs() < 1e-6);
    }
}
