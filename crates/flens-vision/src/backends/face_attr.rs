//! Secondary face detector: boxes, landmarks, and a gender signal.
//!
//! Output contract: one row of 16 floats per face,
//! `[x1, y1, x2, y2, lx0, ly0, lx1, ly1, lx2, ly2, lx3, ly3, lx4, ly4, gender, score]`
//! in input-resolution coordinates. Landmark order is left eye, right eye,
//! nose tip, left mouth corner, right mouth corner.

use std::path::PathBuf;
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use ort::session::Session;
use tracing::{debug, info};

use flens_models::BoundingBox;

use crate::backends::session::{create_session, image_to_tensor, run_session};
use crate::error::{VisionError, VisionResult};
use crate::providers::{FaceAttributeDetector, FaceRecord, LandmarkKind, LandmarkRepr};

/// Floats per face row.
const ROW_LEN: usize = 16;

/// Configuration for the face attribute detector.
#[derive(Debug, Clone)]
pub struct FaceAttributeConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Minimum face score to keep a row
    pub score_threshold: f32,
    /// Square input size fed to the model
    pub input_size: u32,
}

impl FaceAttributeConfig {
    /// Config with the default thresholds.
    pub fn new(model_path: PathBuf) -> Self {
        Self {
            model_path,
            score_threshold: 0.5,
            input_size: 640,
        }
    }
}

/// Face attribute detector backed by an ONNX Runtime session.
pub struct OrtFaceAttributeDetector {
    session: Mutex<Session>,
    config: FaceAttributeConfig,
}

impl OrtFaceAttributeDetector {
    /// Load the model named by the config.
    pub fn new(config: FaceAttributeConfig) -> VisionResult<Self> {
        let session = Mutex::new(create_session(&config.model_path)?);
        info!(
            model_path = %config.model_path.display(),
            input_size = config.input_size,
            "face attribute detector initialized"
        );
        Ok(Self { session, config })
    }
}

impl FaceAttributeDetector for OrtFaceAttributeDetector {
    fn analyze(&self, frame: &DynamicImage) -> VisionResult<Vec<FaceRecord>> {
        let (frame_w, frame_h) = frame.dimensions();
        if frame_w == 0 || frame_h == 0 {
            return Ok(Vec::new());
        }

        let input = image_to_tensor(frame, self.config.input_size, self.config.input_size)?;
        let (_, data) = run_session(&self.session, input, &["output", "output0"])?;

        if data.len() % ROW_LEN != 0 {
            return Err(VisionError::inference(format!(
                "face attribute output length {} is not a multiple of {ROW_LEN}",
                data.len()
            )));
        }

        let records = parse_rows(&self.config, &data, frame_w, frame_h);
        debug!(count = records.len(), "face attribute analysis completed");
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "ort-face-attributes"
    }
}

/// Decode face rows, rescaling coordinates from model input space to frame
/// space. Malformed rows are skipped, never fatal.
fn parse_rows(
    config: &FaceAttributeConfig,
    data: &[f32],
    frame_w: u32,
    frame_h: u32,
) -> Vec<FaceRecord> {
    let input_size = config.input_size as f32;
    let scale_x = frame_w as f32 / input_size;
    let scale_y = frame_h as f32 / input_size;

    let mut records = Vec::new();

    for row in data.chunks_exact(ROW_LEN) {
        let score = row[ROW_LEN - 1];
        if !score.is_finite() || score < config.score_threshold {
            continue;
        }
        if !row[..ROW_LEN - 2].iter().all(|v| v.is_finite()) {
            debug!("skipping face row with non-finite coordinates");
            continue;
        }

        let x1 = ((row[0] * scale_x).round() as i32).clamp(0, frame_w as i32 - 1);
        let y1 = ((row[1] * scale_y).round() as i32).clamp(0, frame_h as i32 - 1);
        let x2 = ((row[2] * scale_x).round() as i32).clamp(0, frame_w as i32 - 1);
        let y2 = ((row[3] * scale_y).round() as i32).clamp(0, frame_h as i32 - 1);
        let bbox = BoundingBox::new(x1, y1, x2, y2);
        if !bbox.is_valid() {
            continue;
        }

        let points: Vec<(f32, f32)> = (0..5)
            .map(|i| (row[4 + 2 * i] * scale_x, row[5 + 2 * i] * scale_y))
            .collect();

        let gender = row[ROW_LEN - 2];
        let gender = gender.is_finite().then(|| gender.clamp(0.0, 1.0));

        records.push(FaceRecord {
            bbox,
            landmarks: vec![LandmarkRepr {
                kind: LandmarkKind::FivePoint,
                points,
            }],
            gender,
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FaceAttributeConfig {
        FaceAttributeConfig::new(PathBuf::from("unused.onnx"))
    }

    #[test]
    fn test_row_parsing_scales_and_filters() {
        // Two rows: one good face at input resolution, one below threshold.
        let mut data = vec![
            64.0, 64.0, 192.0, 192.0, // box
            96.0, 100.0, 160.0, 100.0, // eyes
            128.0, 130.0, // nose
            104.0, 160.0, 152.0, 160.0, // mouth
            0.9, // gender
            0.8, // score
        ];
        data.extend_from_slice(&[
            0.0, 0.0, 10.0, 10.0, 1.0, 1.0, 2.0, 1.0, 1.5, 2.0, 1.0, 3.0, 2.0, 3.0, 0.2, 0.1,
        ]);

        let records = parse_rows(&config(), &data, 1280, 1280);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        // 640 -> 1280 doubles every coordinate.
        assert_eq!(record.bbox, BoundingBox::new(128, 128, 384, 384));
        assert_eq!(record.landmarks[0].points.len(), 5);
        assert_eq!(record.landmarks[0].points[0], (192.0, 200.0));
        assert!((record.gender.unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_row_is_skipped() {
        let data = vec![
            f32::NAN,
            0.0,
            100.0,
            100.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.5,
            0.9,
        ];
        assert!(parse_rows(&config(), &data, 640, 640).is_empty());
    }

    #[test]
    fn test_degenerate_box_is_skipped() {
        let data = vec![
            100.0, 100.0, 100.0, 100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5,
            0.9,
        ];
        assert!(parse_rows(&config(), &data, 640, 640).is_empty());
    }

    #[test]
    fn test_out_of_range_gender_is_clamped() {
        let data = vec![
            10.0, 10.0, 100.0, 100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.7,
            0.9,
        ];
        let records = parse_rows(&config(), &data, 640, 640);
        assert_eq!(records.len(), 1);
        assert!((records[0].gender.unwrap() - 1.0).abs() < 1e-6);
    }
}
