//! Sampled-video and activity-clip controllers.
//!
//! Thin orchestration only: FFmpeg extracts frames to a scratch directory,
//! the engine processes each sample on a blocking task, and per-sample
//! decode failures skip the sample rather than failing the video.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use flens_models::{ActivityPrediction, DetectMode, VideoFrameDetections};

use crate::engine::FrameEngine;
use crate::error::{VisionError, VisionResult};
use crate::ffmpeg::{probe_video, run_ffmpeg, FfmpegCommand};
use crate::providers::ActivityRecognizer;

/// Minimum clip length for activity recognition.
pub const ACTIVITY_CLIP_FRAMES: usize = 16;

/// Run the engine over every `frame_stride`-th frame of a video file.
///
/// Frame indices in the result refer to the source video, so entry `i`
/// carries index `i * frame_stride`.
pub async fn detect_in_video(
    engine: Arc<FrameEngine>,
    video_path: &Path,
    mode: DetectMode,
    frame_stride: u64,
) -> VisionResult<Vec<VideoFrameDetections>> {
    let info = probe_video(video_path).await?;
    if info.width == 0 || info.height == 0 {
        return Err(VisionError::InvalidVideo(
            "video stream has no dimensions".to_string(),
        ));
    }

    let stride = frame_stride.max(1);
    let scratch = tempfile::tempdir()?;
    let pattern = scratch.path().join("frame_%06d.png");

    let cmd = FfmpegCommand::new(video_path, &pattern)
        .video_filter(format!("select=not(mod(n\\,{stride}))"))
        .output_args(["-vsync", "vfr"]);
    run_ffmpeg(&cmd).await?;

    let frame_files = collect_frame_files(scratch.path())?;
    info!(
        samples = frame_files.len(),
        stride,
        duration = info.duration,
        "video sampling complete"
    );

    let samples: Vec<(u64, PathBuf)> = frame_files
        .into_iter()
        .enumerate()
        .map(|(i, path)| (i as u64 * stride, path))
        .collect();

    let results = tokio::task::spawn_blocking(move || -> VisionResult<Vec<VideoFrameDetections>> {
        let mut results = Vec::with_capacity(samples.len());
        for (frame_index, path) in samples {
            let frame = match image::open(&path) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(frame = frame_index, error = %e, "skipping undecodable sampled frame");
                    continue;
                }
            };
            let detections = engine.process_frame(&frame, mode)?;
            results.push(VideoFrameDetections {
                frame: frame_index,
                detections,
            });
        }
        Ok(results)
    })
    .await
    .map_err(|e| VisionError::internal(format!("frame worker failed: {e}")))??;

    // Scratch frames live until here.
    drop(scratch);

    Ok(results)
}

/// Classify the activity in the opening clip of a video file.
pub async fn classify_activity(
    recognizer: Arc<dyn ActivityRecognizer>,
    video_path: &Path,
) -> VisionResult<ActivityPrediction> {
    probe_video(video_path).await?;

    let scratch = tempfile::tempdir()?;
    let pattern = scratch.path().join("clip_%03d.png");

    let cmd = FfmpegCommand::new(video_path, &pattern).max_frames(ACTIVITY_CLIP_FRAMES);
    run_ffmpeg(&cmd).await?;

    let frame_files = collect_frame_files(scratch.path())?;

    let prediction = tokio::task::spawn_blocking(move || -> VisionResult<ActivityPrediction> {
        let mut frames = Vec::with_capacity(frame_files.len());
        for path in &frame_files {
            frames.push(
                image::open(path).map_err(|e| VisionError::InvalidImage(e.to_string()))?,
            );
        }
        if frames.len() < ACTIVITY_CLIP_FRAMES {
            return Err(VisionError::InvalidVideo(format!(
                "video too short for activity recognition: {} of {} frames",
                frames.len(),
                ACTIVITY_CLIP_FRAMES
            )));
        }
        recognizer.classify(&frames)
    })
    .await
    .map_err(|e| VisionError::internal(format!("clip worker failed: {e}")))??;

    drop(scratch);

    info!(
        class_id = prediction.predicted_class_id,
        "activity recognition complete"
    );
    Ok(prediction)
}

/// List extracted frame images in extraction order.
fn collect_frame_files(dir: &Path) -> VisionResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    files.sort();
    Ok(files)
}
