//! Age estimation with test-time augmentation.

use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::{Array4, Axis};
use tracing::debug;

use crate::error::{VisionError, VisionResult};
use crate::providers::AgeEstimator;

/// Crops with a shorter side below this are too small to be informative.
const MIN_CROP_SIDE: u32 = 32;

/// Sentinel for crops the estimator could not score.
const AGE_UNKNOWN: &str = "N/A";

/// Estimate age from an aligned face crop.
///
/// The crop and its horizontal mirror are submitted as one batch; a
/// regression head is averaged and rounded, a classification head is
/// averaged and arg-maxed. The result is clamped to [0, 100].
pub fn estimate_age(estimator: &dyn AgeEstimator, crop: &RgbImage) -> String {
    if crop.width().min(crop.height()) < MIN_CROP_SIDE {
        return AGE_UNKNOWN.to_string();
    }

    match run_estimator(estimator, crop) {
        Ok(age) => age.to_string(),
        Err(e) => {
            debug!("age estimation failed: {e}");
            AGE_UNKNOWN.to_string()
        }
    }
}

fn run_estimator(estimator: &dyn AgeEstimator, crop: &RgbImage) -> VisionResult<i64> {
    let size = estimator.input_size();
    let mirrored = imageops::flip_horizontal(crop);
    let batch = stack_batch(&[crop, &mirrored], size);
    let preds = estimator.predict(batch)?;

    if preds.is_empty() {
        return Err(VisionError::inference("age estimator returned no output"));
    }

    let age = if preds.ncols() == 1 {
        preds
            .mean()
            .ok_or_else(|| VisionError::inference("empty age prediction"))?
            .round() as i64
    } else {
        let avg = preds
            .mean_axis(Axis(0))
            .ok_or_else(|| VisionError::inference("empty age prediction"))?;
        argmax(avg.as_slice().unwrap_or(&[])) as i64
    };

    Ok(age.clamp(0, 100))
}

/// Resize crops to the estimator input size and stack them as a normalized
/// `(N, 3, S, S)` batch.
fn stack_batch(crops: &[&RgbImage], size: u32) -> Array4<f32> {
    let side = size as usize;
    let mut batch = Array4::<f32>::zeros((crops.len(), 3, side, side));
    for (n, crop) in crops.iter().enumerate() {
        let resized = imageops::resize(*crop, size, size, FilterType::Triangle);
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                batch[[n, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }
    }
    batch
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
