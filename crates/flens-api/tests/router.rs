//! Router integration tests over stub model services.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use image::DynamicImage;
use ndarray::{Array2, Array4};
use tower::ServiceExt;

use flens_api::{create_router, ApiConfig, AppState};
use flens_models::{ActivityPrediction, BoundingBox};
use flens_vision::{
    ActivityRecognizer, AgeEstimator, BoxDetector, DetectionCandidate, EmotionEstimator,
    EmotionScore, EngineConfig, FaceAttributeDetector, FaceRecord, FrameEngine, VisionResult,
};

struct StubBoxes(Vec<DetectionCandidate>);

impl BoxDetector for StubBoxes {
    fn detect(&self, _frame: &DynamicImage) -> VisionResult<Vec<DetectionCandidate>> {
        Ok(self.0.clone())
    }

    fn class_name(&self, _class_id: usize) -> &str {
        "person"
    }

    fn name(&self) -> &'static str {
        "stub-boxes"
    }
}

struct StubRecords;

impl FaceAttributeDetector for StubRecords {
    fn analyze(&self, _frame: &DynamicImage) -> VisionResult<Vec<FaceRecord>> {
        Ok(vec![])
    }

    fn name(&self) -> &'static str {
        "stub-records"
    }
}

struct StubAge;

impl AgeEstimator for StubAge {
    fn predict(&self, batch: Array4<f32>) -> VisionResult<Array2<f32>> {
        Ok(Array2::from_elem((batch.dim().0, 1), 35.0))
    }

    fn input_size(&self) -> u32 {
        64
    }

    fn name(&self) -> &'static str {
        "stub-age"
    }
}

struct StubEmotion;

impl EmotionEstimator for StubEmotion {
    fn detect_image(&self, _image: &DynamicImage) -> VisionResult<Vec<EmotionScore>> {
        Ok(vec![EmotionScore {
            label: "Neutral".to_string(),
            probability: 0.9,
        }])
    }

    fn detect_path(&self, _path: &Path) -> VisionResult<Vec<EmotionScore>> {
        self.detect_image(&DynamicImage::new_rgb8(1, 1))
    }

    fn name(&self) -> &'static str {
        "stub-emotion"
    }
}

struct StubActivity;

impl ActivityRecognizer for StubActivity {
    fn classify(&self, _frames: &[DynamicImage]) -> VisionResult<ActivityPrediction> {
        Ok(ActivityPrediction {
            predicted_class_id: 3,
            label: None,
        })
    }

    fn name(&self) -> &'static str {
        "stub-activity"
    }
}

fn test_state() -> AppState {
    let candidates = vec![DetectionCandidate {
        bbox: BoundingBox::new(10, 10, 110, 110),
        confidence: 0.9,
        class_id: 0,
    }];
    let engine = FrameEngine::new(
        Arc::new(StubBoxes(candidates.clone())),
        Arc::new(StubBoxes(candidates)),
        Arc::new(StubRecords),
        Arc::new(StubAge),
        Arc::new(StubEmotion),
        EngineConfig::default(),
    );
    AppState::with_models(
        ApiConfig::default(),
        Arc::new(engine),
        Arc::new(StubActivity),
    )
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(120, 120, image::Rgb([50, 80, 110]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut buf),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
    buf
}

fn multipart_body(file_bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "flenstestboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"frame.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (
        format!("multipart/form-data; boundary={boundary}"),
        body,
    )
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = create_router(test_state(), None);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn detect_objects_returns_detections() {
    let app = create_router(test_state(), None);
    let (content_type, body) = multipart_body(&png_bytes());

    let response = app
        .oneshot(
            Request::post("/detect_objects/")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0]["label"], "person");
    assert_eq!(detections[0]["x1"], 10);
}

#[tokio::test]
async fn detect_faces_composes_labels() {
    let app = create_router(test_state(), None);
    let (content_type, body) = multipart_body(&png_bytes());

    let response = app
        .oneshot(
            Request::post("/detect_faces/")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 1);
    // No secondary record matched: gender gates to N/A, crop attributes run.
    assert_eq!(detections[0]["label"], "N/A, 35, Neutral");
    assert_eq!(detections[0]["color"], serde_json::json!([0, 255, 0]));
}

#[tokio::test]
async fn garbage_upload_is_a_bad_request() {
    let app = create_router(test_state(), None);
    let (content_type, body) = multipart_body(b"definitely not an image");

    let response = app
        .oneshot(
            Request::post("/detect_faces/")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["detail"].as_str().unwrap().contains("Invalid image"));
}

#[tokio::test]
async fn missing_file_field_is_a_bad_request() {
    let app = create_router(test_state(), None);
    let boundary = "flenstestboundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nhello\r\n--{boundary}--\r\n"
    );

    let response = app
        .oneshot(
            Request::post("/detect_objects/")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_video_mode_is_a_bad_request() {
    let app = create_router(test_state(), None);
    let (content_type, body) = multipart_body(b"fake video");

    let response = app
        .oneshot(
            Request::post("/process_video/speech")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["detail"].as_str().unwrap().contains("invalid mode"));
}

#[tokio::test]
async fn security_headers_are_present() {
    let app = create_router(test_state(), None);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().get("X-Request-ID").is_some());
}
