//! Video upload handler with frame sampling and activity recognition.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use tracing::{debug, info};

use flens_models::{VideoMode, VideoResponse, VideoResultEntry};
use flens_vision::{classify_activity, detect_in_video};

use crate::error::{ApiError, ApiResult};
use crate::handlers::detect::read_file_field;
use crate::state::AppState;

/// `POST /process_video/{mode}` - sampled detection or activity recognition
/// over an uploaded video file.
pub async fn process_video(
    Path(mode): Path<String>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoResponse>> {
    let mode: VideoMode = mode
        .parse()
        .map_err(|e: flens_models::ModeParseError| ApiError::bad_request(e.to_string()))?;

    let bytes = read_file_field(&mut multipart).await?;
    debug!(size = bytes.len(), mode = %mode, "received video request");

    // Persist the upload so FFmpeg can read it.
    let upload = tempfile::Builder::new()
        .prefix("flens-upload-")
        .suffix(".mp4")
        .tempfile()
        .map_err(|e| ApiError::internal(format!("failed to create upload file: {e}")))?;
    tokio::fs::write(upload.path(), &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("failed to persist upload: {e}")))?;

    let results = match mode.detect_mode() {
        Some(detect_mode) => {
            let stride = state.engine.config().frame_stride;
            let frames =
                detect_in_video(Arc::clone(&state.engine), upload.path(), detect_mode, stride)
                    .await?;
            info!(frames = frames.len(), mode = %mode, "video processing complete");
            frames.into_iter().map(VideoResultEntry::Frame).collect()
        }
        None => {
            let prediction = classify_activity(Arc::clone(&state.activity), upload.path()).await?;
            vec![VideoResultEntry::Activity(prediction)]
        }
    };

    Ok(Json(VideoResponse { results }))
}
