//! Emotion classification via ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use tracing::info;

use crate::backends::session::{create_session, image_to_tensor, run_session};
use crate::error::{VisionError, VisionResult};
use crate::providers::{EmotionEstimator, EmotionScore};

/// Emotion vocabulary, in the model's output order.
pub const EMOTION_LABELS: [&str; 7] = [
    "Angry", "Disgust", "Fear", "Happy", "Sad", "Surprise", "Neutral",
];

/// Square spatial input size the model was trained on.
const INPUT_SIZE: u32 = 64;

/// Emotion classifier backed by an ONNX Runtime session.
pub struct OrtEmotionEstimator {
    session: Mutex<Session>,
}

impl OrtEmotionEstimator {
    /// Load the model at `model_path`.
    pub fn new(model_path: &Path) -> VisionResult<Self> {
        let session = Mutex::new(create_session(model_path)?);
        info!(model_path = %model_path.display(), "emotion estimator initialized");
        Ok(Self { session })
    }
}

impl EmotionEstimator for OrtEmotionEstimator {
    fn detect_image(&self, image: &DynamicImage) -> VisionResult<Vec<EmotionScore>> {
        let input = image_to_tensor(image, INPUT_SIZE, INPUT_SIZE)?;
        let (_, data) = run_session(&self.session, input, &["output", "output0"])?;

        if data.len() != EMOTION_LABELS.len() {
            return Err(VisionError::inference(format!(
                "emotion output has {} values, expected {}",
                data.len(),
                EMOTION_LABELS.len()
            )));
        }

        let probs = normalize(&data);
        Ok(EMOTION_LABELS
            .iter()
            .zip(probs)
            .map(|(label, probability)| EmotionScore {
                label: label.to_string(),
                probability,
            })
            .collect())
    }

    fn detect_path(&self, path: &Path) -> VisionResult<Vec<EmotionScore>> {
        let image = image::open(path).map_err(|e| VisionError::InvalidImage(e.to_string()))?;
        self.detect_image(&image)
    }

    fn name(&self) -> &'static str {
        "ort-emotion"
    }
}

/// Turn raw model output into probabilities.
///
/// Exported heads differ: some emit softmax probabilities, some raw logits.
/// Values already forming a distribution pass through untouched.
fn normalize(values: &[f32]) -> Vec<f32> {
    let sum: f32 = values.iter().sum();
    let looks_like_probs =
        values.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 0.01;
    if looks_like_probs {
        return values.to_vec();
    }

    let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probabilities_pass_through() {
        let probs = vec![0.1, 0.05, 0.05, 0.6, 0.1, 0.05, 0.05];
        assert_eq!(normalize(&probs), probs);
    }

    #[test]
    fn test_logits_are_softmaxed() {
        let logits = vec![1.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0];
        let probs = normalize(&logits);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let max_idx = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(max_idx, 3);
    }
}
