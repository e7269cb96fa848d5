//! Single-image detection handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::debug;

use flens_models::{DetectMode, DetectionsResponse};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// `POST /detect_objects/` - object detection on an uploaded image.
pub async fn detect_objects(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<DetectionsResponse>> {
    detect_image(state, multipart, DetectMode::Object).await
}

/// `POST /detect_faces/` - face detection with the attribute cascade.
pub async fn detect_faces(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<DetectionsResponse>> {
    detect_image(state, multipart, DetectMode::Face).await
}

async fn detect_image(
    state: AppState,
    mut multipart: Multipart,
    mode: DetectMode,
) -> ApiResult<Json<DetectionsResponse>> {
    let bytes = read_file_field(&mut multipart).await?;
    debug!(size = bytes.len(), mode = %mode, "received detection request");

    let frame = image::load_from_memory(&bytes)
        .map_err(|_| ApiError::bad_request("Invalid image"))?;

    let engine = Arc::clone(&state.engine);
    let started = Instant::now();
    let detections = tokio::task::spawn_blocking(move || engine.process_frame(&frame, mode))
        .await
        .map_err(|e| ApiError::internal(format!("frame worker failed: {e}")))??;

    metrics::record_frame_processed(
        mode.as_str(),
        detections.len(),
        started.elapsed().as_secs_f64(),
    );

    Ok(Json(DetectionsResponse { detections }))
}

/// Pull the `file` field out of a multipart upload.
pub(crate) async fn read_file_field(multipart: &mut Multipart) -> ApiResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            return Ok(field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?
                .to_vec());
        }
    }
    Err(ApiError::bad_request("Missing 'file' field"))
}
