//! Shared ONNX Runtime session plumbing.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::info;

use crate::error::{VisionError, VisionResult};

/// Reject model files smaller than this as corrupted downloads.
const MIN_MODEL_FILE_SIZE: u64 = 50_000;

/// Create an ONNX Runtime session with automatic execution provider
/// selection: CUDA on Linux (behind the `cuda` feature), CoreML on macOS,
/// CPU everywhere else.
pub(crate) fn create_session(model_path: &Path) -> VisionResult<Session> {
    if !model_path.exists() {
        return Err(VisionError::model_not_found(
            model_path.display().to_string(),
        ));
    }

    let metadata = std::fs::metadata(model_path)?;
    if metadata.len() < MIN_MODEL_FILE_SIZE {
        return Err(VisionError::model_not_found(format!(
            "{} appears corrupted ({} bytes)",
            model_path.display(),
            metadata.len()
        )));
    }

    let model_bytes = std::fs::read(model_path)?;

    let builder = Session::builder()
        .map_err(|e| VisionError::inference(format!("failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::inference(format!("failed to set optimization level: {e}")))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("using CUDA execution provider for {}", model_path.display());
                return Ok(session);
            }
        }
        tracing::debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!(
                    "using CoreML execution provider for {}",
                    model_path.display()
                );
                return Ok(session);
            }
        }
        tracing::debug!("CoreML execution provider not available, using CPU");
    }

    info!("using CPU execution provider for {}", model_path.display());
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| VisionError::inference(format!("failed to load ONNX model: {e}")))
}

/// Resize a frame and lay it out as a normalized `[1, 3, H, W]` tensor.
pub(crate) fn image_to_tensor(img: &DynamicImage, width: u32, height: u32) -> VisionResult<Value> {
    let resized = img.resize_exact(width, height, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let (w, h) = (width as usize, height as usize);

    // HWC -> CHW with normalization to [0, 1]
    let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                chw_data.push(pixel[c] as f32 / 255.0);
            }
        }
    }

    tensor_from_parts(vec![1, 3, h, w], chw_data)
}

/// Build an ort value from a shape and raw data.
pub(crate) fn tensor_from_parts(shape: Vec<usize>, data: Vec<f32>) -> VisionResult<Value> {
    Tensor::from_array((shape, data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| VisionError::inference(format!("failed to create tensor: {e}")))
}

/// Run a session on one input and extract the named output tensor.
///
/// Output names are tried in order; model exporters disagree on whether the
/// head is called `output` or `output0`.
pub(crate) fn run_session(
    session: &Mutex<Session>,
    input: Value,
    output_names: &[&str],
) -> VisionResult<(Vec<usize>, Vec<f32>)> {
    let mut session = session
        .lock()
        .map_err(|_| VisionError::internal("model session poisoned"))?;

    let outputs = session
        .run(ort::inputs![input])
        .map_err(|e| VisionError::inference(format!("ONNX inference failed: {e}")))?;

    let output = output_names
        .iter()
        .find_map(|name| outputs.get(*name))
        .ok_or_else(|| {
            VisionError::inference(format!("missing output tensor (tried {output_names:?})"))
        })?;

    let tensor = output
        .try_extract_tensor::<f32>()
        .map_err(|e| VisionError::inference(format!("failed to extract tensor: {e}")))?;

    let shape: Vec<usize> = tensor.0.iter().map(|&d| d as usize).collect();
    let data: Vec<f32> = tensor.1.to_vec();
    Ok((shape, data))
}
