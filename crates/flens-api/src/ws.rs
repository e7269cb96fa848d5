//! Live frame-stream WebSocket endpoint.
//!
//! Clients send base64-encoded frames as text messages and receive a
//! detections message per frame. The literal text `"close"` ends the
//! session. A bad frame produces an in-band error and the stream continues.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use tokio::time::interval;
use tracing::{info, warn};

use flens_models::{DetectMode, StreamMessage};

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Heartbeat interval to keep idle streams alive.
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// `GET /ws_detect/{mode}` - live detection stream.
pub async fn ws_detect(
    Path(mode): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    let mode: DetectMode = match mode.parse() {
        Ok(mode) => mode,
        Err(e) => {
            return ApiError::bad_request(format!("{e}")).into_response();
        }
    };

    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection(mode.as_str());

    ws.on_upgrade(move |socket| async move {
        handle_detect_socket(socket, state, mode).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

/// Per-connection loop: one frame in, one detections message out.
async fn handle_detect_socket(socket: WebSocket, state: AppState, mode: DetectMode) {
    info!(mode = %mode, "websocket detect stream opened");

    let (mut sender, mut receiver) = socket.split();
    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if text == "close" {
                            break;
                        }
                        metrics::record_ws_message_received(mode.as_str());

                        let reply = process_stream_frame(&state, mode, &text).await;
                        let json = match serde_json::to_string(&reply) {
                            Ok(json) => json,
                            Err(_) => continue,
                        };
                        if sender.send(Message::Text(json)).await.is_err() {
                            warn!("websocket send failed, client disconnected");
                            break;
                        }
                        metrics::record_ws_message_sent(mode.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary/ping/pong ignored
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket receive error");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    warn!("heartbeat failed, client disconnected");
                    break;
                }
            }
        }
    }

    info!(mode = %mode, "websocket detect stream closed");
}

/// Decode and process one streamed frame; failures come back in-band.
async fn process_stream_frame(state: &AppState, mode: DetectMode, text: &str) -> StreamMessage {
    let bytes = match BASE64.decode(text) {
        Ok(bytes) => bytes,
        Err(e) => return StreamMessage::error(format!("invalid base64 frame: {e}")),
    };
    let frame = match image::load_from_memory(&bytes) {
        Ok(frame) => frame,
        Err(e) => return StreamMessage::error(format!("invalid frame: {e}")),
    };

    let engine = Arc::clone(&state.engine);
    let started = std::time::Instant::now();
    match tokio::task::spawn_blocking(move || engine.process_frame(&frame, mode)).await {
        Ok(Ok(detections)) => {
            metrics::record_frame_processed(
                mode.as_str(),
                detections.len(),
                started.elapsed().as_secs_f64(),
            );
            StreamMessage::detections(detections)
        }
        Ok(Err(e)) => StreamMessage::error(format!("frame processing failed: {e}")),
        Err(e) => StreamMessage::error(format!("frame worker failed: {e}")),
    }
}
