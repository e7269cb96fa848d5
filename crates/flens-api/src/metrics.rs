//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "flens_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "flens_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "flens_http_requests_in_flight";

    // WebSocket metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "flens_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "flens_ws_connections_active";
    pub const WS_MESSAGES_SENT: &str = "flens_ws_messages_sent_total";
    pub const WS_MESSAGES_RECEIVED: &str = "flens_ws_messages_received_total";

    // Frame processing metrics
    pub const FRAMES_PROCESSED_TOTAL: &str = "flens_frames_processed_total";
    pub const DETECTIONS_TOTAL: &str = "flens_detections_total";
    pub const FRAME_DURATION_SECONDS: &str = "flens_frame_duration_seconds";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "flens_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record WebSocket connection.
pub fn record_ws_connection(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::WS_CONNECTIONS_TOTAL, &labels).increment(1);
}

/// Update active WebSocket connections gauge.
pub fn set_ws_active_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record WebSocket message sent.
pub fn record_ws_message_sent(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::WS_MESSAGES_SENT, &labels).increment(1);
}

/// Record WebSocket message received.
pub fn record_ws_message_received(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::WS_MESSAGES_RECEIVED, &labels).increment(1);
}

/// Record a processed frame with its detection count and duration.
pub fn record_frame_processed(mode: &str, detections: usize, duration_secs: f64) {
    let labels = [("mode", mode.to_string())];
    counter!(names::FRAMES_PROCESSED_TOTAL, &labels).increment(1);
    counter!(names::DETECTIONS_TOTAL, &labels).increment(detections as u64);
    histogram!(names::FRAME_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (collapse mode segments).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"^/process_video/[^/]+")
        .unwrap()
        .replace(path, "/process_video/:mode");
    let path = regex_lite::Regex::new(r"^/ws_detect/[^/]+")
        .unwrap()
        .replace(&path, "/ws_detect/:mode");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
