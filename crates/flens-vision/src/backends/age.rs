//! Age estimation via ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, Array4};
use ort::session::Session;
use tracing::info;

use crate::backends::session::{create_session, run_session, tensor_from_parts};
use crate::error::{VisionError, VisionResult};
use crate::providers::AgeEstimator;

/// Square spatial input size the model was trained on.
const INPUT_SIZE: u32 = 256;

/// Age estimator backed by an ONNX Runtime session.
///
/// Works with both head shapes: a single-scalar regression output or a
/// probability vector over age bins; the caller inspects the column count.
pub struct OrtAgeEstimator {
    session: Mutex<Session>,
}

impl OrtAgeEstimator {
    /// Load the model at `model_path`.
    pub fn new(model_path: &Path) -> VisionResult<Self> {
        let session = Mutex::new(create_session(model_path)?);
        info!(model_path = %model_path.display(), "age estimator initialized");
        Ok(Self { session })
    }
}

impl AgeEstimator for OrtAgeEstimator {
    fn predict(&self, batch: Array4<f32>) -> VisionResult<Array2<f32>> {
        let (n, c, h, w) = batch.dim();
        if n == 0 {
            return Err(VisionError::inference("empty age batch"));
        }

        let input = tensor_from_parts(vec![n, c, h, w], batch.into_raw_vec())?;
        let (_, data) = run_session(&self.session, input, &["output", "output0"])?;

        if data.is_empty() || data.len() % n != 0 {
            return Err(VisionError::inference(format!(
                "age output length {} does not divide into {n} rows",
                data.len()
            )));
        }

        let cols = data.len() / n;
        Array2::from_shape_vec((n, cols), data)
            .map_err(|e| VisionError::inference(format!("failed to shape age output: {e}")))
    }

    fn input_size(&self) -> u32 {
        INPUT_SIZE
    }

    fn name(&self) -> &'static str {
        "ort-age"
    }
}
