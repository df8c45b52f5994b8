//! Integration tests for the HTTP API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`, using the
//! stub detector and an in-memory store.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use embedding::{EmbeddingPipeline, StubFaceDetector, EMBEDDING_DIM};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use store::{InMemoryStore, RecordStore, StoreError, StoredDocument};
use tower::ServiceExt;

const BOUNDARY: &str = "facematch-test-boundary";

fn test_config() -> ServerConfig {
    ServerConfig {
        metrics_enabled: false,
        ..ServerConfig::default()
    }
}

fn app_with_store(store: Arc<dyn RecordStore>) -> Router {
    app_with(test_config(), store)
}

fn app_with(config: ServerConfig, store: Arc<dyn RecordStore>) -> Router {
    let state = ServerState::with_components(config, Arc::new(StubFaceDetector::new()), store)
        .expect("test state");
    build_router(Arc::new(state))
}

fn encode_png(img: RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("png encode");
    buf
}

fn face_png() -> Vec<u8> {
    encode_png(RgbImage::from_fn(32, 32, |x, y| {
        Rgb([(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8])
    }))
}

fn blank_png() -> Vec<u8> {
    encode_png(RgbImage::from_pixel(16, 16, Rgb([200, 200, 200])))
}

fn basis(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; EMBEDDING_DIM];
    v[axis] = 1.0;
    v
}

fn at_similarity(s: f32) -> Vec<f32> {
    let mut v = vec![0.0; EMBEDDING_DIM];
    v[0] = s;
    v[1] = (1.0 - s * s).sqrt();
    v
}

/// Build a multipart body from `(name, filename, bytes)` parts.
fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Body {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(file) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n\
                         Content-Type: image/png\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn multipart_request(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

struct DownStore;

#[async_trait]
impl RecordStore for DownStore {
    async fn fetch_all(&self, _collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        Err(StoreError::unavailable("connection refused by 10.0.0.7"))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused by 10.0.0.7"))
    }

    fn backend_name(&self) -> &'static str {
        "down"
    }
}

#[tokio::test]
async fn health_reports_model_and_dimension() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "facematch-server");
    assert_eq!(body["model"], "stub");
    assert_eq!(body["embedding_dimension"], 512);
}

#[tokio::test]
async fn ready_checks_the_store() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let (status, body) = send(app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["components"]["store"], "in_memory");

    let app = app_with_store(Arc::new(DownStore));
    let (status, body) = send(app, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn generate_embedding_from_multipart_file() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let png = face_png();
    let request = multipart_request(
        "/generate-embedding",
        multipart(&[("file", Some("face.png"), png.as_slice())]),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["dimension"], 512);

    let values = body["embedding"].as_array().unwrap();
    assert_eq!(values.len(), 512);
    let norm: f64 = values
        .iter()
        .map(|v| v.as_f64().unwrap().powi(2))
        .sum::<f64>()
        .sqrt();
    assert!((norm - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn generate_embedding_from_raw_body_is_deterministic() {
    let png = face_png();
    let raw = |bytes: Vec<u8>| {
        Request::builder()
            .method(Method::POST)
            .uri("/generate-embedding")
            .header(header::CONTENT_TYPE, "image/png")
            .body(Body::from(bytes))
            .unwrap()
    };

    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let (s1, first) = send(app.clone(), raw(png.clone())).await;
    let (s2, second) = send(app, raw(png)).await;
    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(first["embedding"], second["embedding"]);
}

#[tokio::test]
async fn generate_embedding_without_face_is_400() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let png = blank_png();
    let request = multipart_request(
        "/generate-embedding",
        multipart(&[("file", Some("wall.png"), png.as_slice())]),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "NO_FACE_DETECTED");
}

#[tokio::test]
async fn generate_embedding_with_garbage_is_400() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let request = multipart_request(
        "/generate-embedding",
        multipart(&[("file", Some("x.png"), &b"definitely not an image"[..])]),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "DECODE_ERROR");
}

#[tokio::test]
async fn generate_embedding_missing_file_is_400() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let request = multipart_request(
        "/generate-embedding",
        multipart(&[("note", None, &b"no image here"[..])]),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert(
        "embeddings",
        "p-high",
        json!({"embedding": at_similarity(0.9), "name": "High", "age": 30}),
    );
    store.insert(
        "embeddings",
        "p-mid",
        json!({"embedding": at_similarity(0.6), "imageUrl": "https://img/mid.png"}),
    );
    store.insert("embeddings", "p-low", json!({"embedding": at_similarity(0.3)}));
    store.insert("embeddings", "broken", json!({"embedding": vec![0.1; 10]}));
    store
}

#[tokio::test]
async fn match_face_with_json_embedding() {
    let app = app_with_store(seeded_store());
    let request = json_request(
        "/match-face",
        json!({"embedding": basis(0), "threshold": 0.5}),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["matches_found"], 2);
    assert_eq!(body["threshold"].as_f64(), Some(0.5));

    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches[0]["person_id"], "p-high");
    assert_eq!(matches[0]["name"], "High");
    assert_eq!(matches[0]["age"], 30);
    assert_eq!(matches[1]["person_id"], "p-mid");
    assert_eq!(matches[1]["imageUrl"], "https://img/mid.png");
    assert!(matches[1].get("name").is_none());
    assert!((matches[0]["similarity"].as_f64().unwrap() - 0.9).abs() < 1e-4);
}

#[tokio::test]
async fn match_face_uses_default_threshold() {
    let app = app_with_store(seeded_store());
    let (status, body) = send(app, json_request("/match-face", json!({"embedding": basis(0)}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold"].as_f64(), Some(0.55));
    assert_eq!(body["matches_found"], 2);
}

#[tokio::test]
async fn body_threshold_wins_over_query_parameter() {
    let app = app_with_store(seeded_store());
    let request = json_request(
        "/match-face?threshold=0.1",
        json!({"embedding": basis(0), "threshold": 0.8}),
    );
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold"].as_f64(), Some(0.8));
    assert_eq!(body["matches_found"], 1);

    let request = json_request("/match-face?threshold=0.1", json!({"embedding": basis(0)}));
    let (_, body) = send(app, request).await;
    assert_eq!(body["threshold"].as_f64(), Some(0.1));
    assert_eq!(body["matches_found"], 3);
}

#[tokio::test]
async fn invalid_threshold_is_400() {
    let app = app_with_store(seeded_store());
    let request = json_request(
        "/match-face?threshold=1.5",
        json!({"embedding": basis(0)}),
    );
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_THRESHOLD");

    let request = json_request("/match-face?threshold=lots", json!({"embedding": basis(0)}));
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn invalid_query_embeddings_are_400() {
    let app = app_with_store(seeded_store());

    let (status, body) = send(
        app.clone(),
        json_request("/match-face", json!({"embedding": [0.1, 0.2, 0.3]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "DIMENSION_MISMATCH");

    let (status, body) = send(
        app.clone(),
        json_request("/match-face", json!({"embedding": "0.1,0.2"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_EMBEDDING");

    let (status, body) = send(
        app.clone(),
        json_request("/match-face", json!({"embedding": vec![0.0; 512]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "ZERO_NORM");

    let (status, body) = send(app, json_request("/match-face", json!({"threshold": 0.5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn match_face_with_uploaded_image() {
    let png = face_png();
    let pipeline = EmbeddingPipeline::new(Arc::new(StubFaceDetector::new()));
    let enrolled = pipeline.embed_bytes(&png).await.unwrap();

    let store = seeded_store();
    store.insert(
        "embeddings",
        "same-face",
        json!({"embedding": enrolled.as_slice(), "name": "Enrolled"}),
    );
    let app = app_with_store(store);

    let request = multipart_request(
        "/match-face",
        multipart(&[
            ("file", Some("query.png"), png.as_slice()),
            ("threshold", None, &b"0.99"[..]),
        ]),
    );
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold"].as_f64(), Some(0.99));
    assert_eq!(body["matches_found"], 1);
    assert_eq!(body["matches"][0]["person_id"], "same-face");
    assert_eq!(body["matches"][0]["name"], "Enrolled");
    assert!((body["matches"][0]["similarity"].as_f64().unwrap() - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn match_face_with_multipart_embedding_field() {
    let app = app_with_store(seeded_store());
    let embedding = serde_json::to_string(&basis(0)).unwrap();
    let request = multipart_request(
        "/match-face",
        multipart(&[("embedding", None, embedding.as_bytes())]),
    );

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matches_found"], 2);
}

#[tokio::test]
async fn match_face_without_face_is_400() {
    let app = app_with_store(seeded_store());
    let png = blank_png();
    let request = multipart_request("/match-face", multipart(&[("file", Some("b.png"), png.as_slice())]));

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "NO_FACE_DETECTED");
}

#[tokio::test]
async fn store_failure_is_500_without_details() {
    let app = app_with_store(Arc::new(DownStore));
    let (status, body) = send(app, json_request("/match-face", json!({"embedding": basis(0)}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "STORE_UNAVAILABLE");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(!message.contains("10.0.0.7"));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let (status, body) = send(app, get("/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn metrics_disabled_is_404() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let (status, _) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_render_match_counters() {
    let config = ServerConfig {
        metrics_enabled: true,
        ..ServerConfig::default()
    };
    let app = app_with(config, seeded_store());

    let (status, _) = send(
        app.clone(),
        json_request("/match-face", json!({"embedding": basis(0)})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("facematch_match_requests_total"));
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn cors_allows_only_configured_origins() {
    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/match-face")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let app = app_with_store(Arc::new(InMemoryStore::new()));
    let response = app
        .clone()
        .oneshot(preflight("http://localhost:3000"))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
