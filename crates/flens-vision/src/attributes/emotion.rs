//! Emotion estimation with a temp-file fallback path.

use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::error::VisionResult;
use crate::providers::{EmotionEstimator, EmotionScore};

/// Crops with a shorter side below this are too small for expressions.
const MIN_CROP_SIDE: u32 = 48;

/// Below this top probability the estimator's opinion is discounted.
const CONFIDENCE_FLOOR: f32 = 0.30;

const EMOTION_UNKNOWN: &str = "Unknown";

/// Estimate the dominant emotion of an aligned face crop.
///
/// Low-confidence calls are never surfaced as a specific label: the
/// confidence is reported but the label degrades to `"Unknown"`.
pub fn estimate_emotion(estimator: &dyn EmotionEstimator, crop: &RgbImage) -> (String, f32) {
    if crop.width().min(crop.height()) < MIN_CROP_SIDE {
        return (EMOTION_UNKNOWN.to_string(), 0.0);
    }

    let scores = match detect_with_fallback(estimator, crop) {
        Ok(scores) => scores,
        Err(e) => {
            debug!("emotion estimation failed: {e}");
            return (EMOTION_UNKNOWN.to_string(), 0.0);
        }
    };

    let Some(top) = scores.iter().max_by(|a, b| {
        a.probability
            .partial_cmp(&b.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    }) else {
        return (EMOTION_UNKNOWN.to_string(), 0.0);
    };

    if top.probability < CONFIDENCE_FLOOR {
        return (EMOTION_UNKNOWN.to_string(), top.probability);
    }
    (top.label.clone(), top.probability)
}

/// Try the in-memory path first; on failure write the crop to a named temp
/// file and hand the estimator the path. The temp file is removed on every
/// exit path when the handle drops.
fn detect_with_fallback(
    estimator: &dyn EmotionEstimator,
    crop: &RgbImage,
) -> VisionResult<Vec<EmotionScore>> {
    let image = DynamicImage::ImageRgb8(crop.clone());
    match estimator.detect_image(&image) {
        Ok(scores) => Ok(scores),
        Err(e) => {
            debug!("in-memory emotion path failed ({e}), retrying via temp file");
            let tmp = tempfile::Builder::new()
                .prefix("flens-face-")
                .suffix(".jpg")
                .tempfile()?;
            image
                .save(tmp.path())
                .map_err(|e| crate::error::VisionError::InvalidImage(e.to_string()))?;
            estimator.detect_path(tmp.path())
        }
    }
}
