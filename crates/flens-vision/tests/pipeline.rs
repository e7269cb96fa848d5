//! End-to-end pipeline scenarios over stub model services.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use ndarray::{Array2, Array4};

use flens_models::{BoundingBox, DetectMode, Rgb};
use flens_vision::{
    AgeEstimator, BoxDetector, DetectionCandidate, EmotionEstimator, EmotionScore, EngineConfig,
    FaceAttributeDetector, FaceRecord, FrameEngine, LandmarkKind, LandmarkRepr, VisionResult,
};

struct StubBoxes(Vec<DetectionCandidate>);

impl BoxDetector for StubBoxes {
    fn detect(&self, _frame: &DynamicImage) -> VisionResult<Vec<DetectionCandidate>> {
        Ok(self.0.clone())
    }

    fn class_name(&self, _class_id: usize) -> &str {
        "Face"
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

struct StubAge;

impl AgeEstimator for StubAge {
    fn predict(&self, batch: Array4<f32>) -> VisionResult<Array2<f32>> {
        Ok(Array2::from_elem((batch.dim().0, 1), 29.0))
    }

    fn input_size(&self) -> u32 {
        64
    }

    fn name(&self) -> &'static str {
        "stub-age"
    }
}

/// Emotion backend that rejects in-memory input, forcing the temp-file path.
struct PathOnlyEmotion;

impl EmotionEstimator for PathOnlyEmotion {
    fn detect_image(&self, _image: &DynamicImage) -> VisionResult<Vec<EmotionScore>> {
        Err(flens_vision::VisionError::inference(
            "backend requires a file path",
        ))
    }

    fn detect_path(&self, path: &Path) -> VisionResult<Vec<EmotionScore>> {
        assert!(path.exists());
        Ok(vec![
            EmotionScore {
                label: "Neutral".to_string(),
                probability: 0.25,
            },
            EmotionScore {
                label: "Happy".to_string(),
                probability: 0.6,
            },
        ])
    }

    fn name(&self) -> &'static str {
        "path-only-emotion"
    }
}

fn frame() -> DynamicImage {
    DynamicImage::ImageRgb8(image::RgbImage::from_fn(200, 200, |x, y| {
        image::Rgb([(x % 251) as u8, (y % 251) as u8, 77])
    }))
}

fn engine_with(candidates: Vec<DetectionCandidate>, records: Vec<FaceRecord>) -> FrameEngine {
    FrameEngine::new(
        Arc::new(StubBoxes(candidates.clone())),
        Arc::new(StubBoxes(candidates)),
        Arc::new(StubRecords(records)),
        Arc::new(StubAge),
        Arc::new(PathOnlyEmotion),
        EngineConfig::default(),
    )
}

fn face_candidate() -> DetectionCandidate {
    DetectionCandidate {
        bbox: BoundingBox::new(10, 10, 110, 110),
        confidence: 0.9,
        class_id: 0,
    }
}

#[test]
fn full_face_pipeline_with_matched_record_and_level_eyes() {
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
    let engine = engine_with(vec![face_candidate()], vec![record]);

    let detections = engine.process_frame(&frame(), DetectMode::Face).unwrap();
    assert_eq!(detections.len(), 1);
    let det = &detections[0];

    // Gender trusted (IoU 1.0), age numeric, emotion above the 0.30 floor
    // even though it had to take the temp-file path.
    assert_eq!(det.label, "Male, 29, Happy");
    assert!((det.conf - 0.9).abs() < 1e-6);
    assert_eq!(det.color, Rgb(0, 255, 0));
    assert_eq!(det.bbox(), BoundingBox::new(10, 10, 110, 110));
}

#[test]
fn unmatched_primary_box_falls_back_and_gates_gender() {
    let far_record = FaceRecord {
        bbox: BoundingBox::new(160, 160, 190, 190),
        landmarks: vec![],
        gender: Some(1.0),
    };
    let engine = engine_with(vec![face_candidate()], vec![far_record]);

    let detections = engine.process_frame(&frame(), DetectMode::Face).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "N/A, 29, Happy");
}

#[test]
fn tiny_face_keeps_entry_with_attribute_sentinels() {
    let candidate = DetectionCandidate {
        bbox: BoundingBox::new(10, 10, 30, 30),
        confidence: 0.55,
        class_id: 0,
    };
    let record = FaceRecord {
        bbox: BoundingBox::new(10, 10, 30, 30),
        landmarks: vec![],
        gender: Some(0.9),
    };
    let engine = engine_with(vec![candidate], vec![record]);

    let detections = engine.process_frame(&frame(), DetectMode::Face).unwrap();
    assert_eq!(detections.len(), 1);
    // Alignment succeeded, so the entry is emitted; both crop-driven
    // attributes degrade to their sentinels, gender still comes from the
    // matched record.
    assert_eq!(detections[0].label, "Male, N/A, Unknown");
}

#[test]
fn tilted_eyes_still_produce_a_full_label() {
    let record = FaceRecord {
        bbox: BoundingBox::new(10, 10, 110, 110),
        landmarks: vec![LandmarkRepr {
            kind: LandmarkKind::FivePoint,
            points: vec![(40.0, 40.0), (80.0, 60.0)],
        }],
        gender: Some(0.2),
    };
    let engine = engine_with(vec![face_candidate()], vec![record]);

    let detections = engine.process_frame(&frame(), DetectMode::Face).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "Female, 29, Happy");
}

#[test]
fn empty_frame_yields_empty_results() {
    let engine = engine_with(vec![], vec![]);
    let detections = engine.process_frame(&frame(), DetectMode::Face).unwrap();
    assert!(detections.is_empty());
}
