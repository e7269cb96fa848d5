//! Application state.

use std::sync::Arc;

use flens_vision::{ActivityRecognizer, EngineConfig, FrameEngine, OrtActivityRecognizer};

use crate::config::ApiConfig;

/// Shared application state.
///
/// Model sessions live here for the lifetime of the process; every request
/// works against the same handles.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub engine: Arc<FrameEngine>,
    pub activity: Arc<dyn ActivityRecognizer>,
}

impl AppState {
    /// Load all models and build the application state.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let engine_config = EngineConfig::from_env();
        let activity = OrtActivityRecognizer::new(
            &engine_config.activity_model_path,
            engine_config.activity_labels_path.as_deref(),
        )?;
        let engine = FrameEngine::from_config(engine_config)?;

        Ok(Self {
            config,
            engine: Arc::new(engine),
            activity: Arc::new(activity),
        })
    }

    /// Build state from already-constructed model handles.
    pub fn with_models(
        config: ApiConfig,
        engine: Arc<FrameEngine>,
        activity: Arc<dyn ActivityRecognizer>,
    ) -> Self {
        Self {
            config,
            engine,
            activity,
        }
    }
}
