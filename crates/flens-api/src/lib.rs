//! Axum HTTP API server.
//!
//! This crate provides:
//! - Image upload endpoints for object and face detection
//! - Video upload endpoint with frame sampling and activity recognition
//! - A WebSocket endpoint for live frame streams
//! - Rate limiting, security headers, and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
