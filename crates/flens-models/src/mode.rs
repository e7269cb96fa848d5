//! Detection mode enums shared by the HTTP and WebSocket surfaces.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A mode string that none of the endpoints recognize.
#[derive(Debug, Clone, Error)]
#[error("invalid mode '{0}', expected 'object', 'face', or 'har'")]
pub struct ModeParseError(pub String);

/// Per-frame detection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetectMode {
    /// General object detection with the trained class vocabulary.
    Object,
    /// Face detection with the fusion and attribute cascade.
    Face,
}

impl DetectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectMode::Object => "object",
            DetectMode::Face => "face",
        }
    }
}

impl FromStr for DetectMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(DetectMode::Object),
            "face" => Ok(DetectMode::Face),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

impl fmt::Display for DetectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video processing mode: the two per-frame modes plus activity recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VideoMode {
    Object,
    Face,
    /// Whole-clip human activity recognition ("har" on the wire).
    Activity,
}

impl VideoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoMode::Object => "object",
            VideoMode::Face => "face",
            VideoMode::Activity => "har",
        }
    }

    /// The per-frame mode this video mode samples with, if any.
    pub fn detect_mode(&self) -> Option<DetectMode> {
        match self {
            VideoMode::Object => Some(DetectMode::Object),
            VideoMode::Face => Some(DetectMode::Face),
            VideoMode::Activity => None,
        }
    }
}

impl FromStr for VideoMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(VideoMode::Object),
            "face" => Ok(VideoMode::Face),
            "har" | "activity" => Ok(VideoMode::Activity),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
