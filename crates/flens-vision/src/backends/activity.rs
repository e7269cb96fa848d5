//! Video activity recognition (R(2+1)D-style clip classifier).

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use tracing::info;

use flens_models::ActivityPrediction;

use crate::backends::session::{create_session, run_session, tensor_from_parts};
use crate::error::{VisionError, VisionResult};
use crate::providers::ActivityRecognizer;

/// Frames per classified clip.
const CLIP_LEN: usize = 16;

/// Square spatial input size per frame.
const INPUT_SIDE: u32 = 112;

/// Kinetics channel statistics from the original training recipe.
const MEAN: [f32; 3] = [0.43216, 0.394_666, 0.37645];
const STD: [f32; 3] = [0.22803, 0.22145, 0.216_989];

/// Activity recognizer backed by an ONNX Runtime session.
pub struct OrtActivityRecognizer {
    session: Mutex<Session>,
    labels: Option<Vec<String>>,
}

impl OrtActivityRecognizer {
    /// Load the model, plus an optional newline-separated labels file.
    pub fn new(model_path: &Path, labels_path: Option<&Path>) -> VisionResult<Self> {
        let session = Mutex::new(create_session(model_path)?);

        let labels = match labels_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let labels: Vec<String> = text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                info!(classes = labels.len(), "activity labels loaded");
                Some(labels)
            }
            None => None,
        };

        info!(model_path = %model_path.display(), "activity recognizer initialized");
        Ok(Self { session, labels })
    }

    /// Lay out the first [`CLIP_LEN`] frames as a `(1, 3, T, H, W)` tensor
    /// with Kinetics normalization.
    fn clip_tensor(frames: &[DynamicImage]) -> VisionResult<ort::value::Value> {
        let side = INPUT_SIDE as usize;
        let mut data = vec![0.0f32; 3 * CLIP_LEN * side * side];

        for (t, frame) in frames.iter().take(CLIP_LEN).enumerate() {
            let resized = frame
                .resize_exact(INPUT_SIDE, INPUT_SIDE, image::imageops::FilterType::Triangle)
                .to_rgb8();
            for (x, y, pixel) in resized.enumerate_pixels() {
                for c in 0..3 {
                    let value = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
                    let index = ((c * CLIP_LEN + t) * side + y as usize) * side + x as usize;
                    data[index] = value;
                }
            }
        }

        tensor_from_parts(vec![1, 3, CLIP_LEN, side, side], data)
    }
}

impl ActivityRecognizer for OrtActivityRecognizer {
    fn classify(&self, frames: &[DynamicImage]) -> VisionResult<ActivityPrediction> {
        if frames.len() < CLIP_LEN {
            return Err(VisionError::InvalidVideo(format!(
                "activity clip needs at least {CLIP_LEN} frames, got {}",
                frames.len()
            )));
        }

        let input = Self::clip_tensor(frames)?;
        let (_, logits) = run_session(&self.session, input, &["output", "output0", "logits"])?;

        if logits.is_empty() {
            return Err(VisionError::inference("activity model returned no logits"));
        }

        let predicted_class_id = logits
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);

        let label = self
            .labels
            .as_ref()
            .and_then(|labels| labels.get(predicted_class_id).cloned());

        Ok(ActivityPrediction {
            predicted_class_id,
            label,
        })
    }

    fn name(&self) -> &'static str {
        "ort-activity"
    }
}
