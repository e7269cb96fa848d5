//! WebSocket messages for the live detect stream.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// Server-to-client message on a `/ws_detect/{mode}` stream.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Detections for one submitted frame.
    Detections { detections: Vec<Detection> },

    /// Per-frame failure; the stream stays open for the next frame.
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl StreamMessage {
    /// Create a detections message.
    pub fn detections(detections: Vec<Detection>) -> Self {
        StreamMessage::Detections { detections }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        StreamMessage::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
