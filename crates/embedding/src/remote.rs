use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::DetectionError;
use crate::pipeline::{BoundingBox, DecodedImage, DetectedFace, FaceDetector};

/// Detector backed by an inference sidecar reachable over HTTP.
///
/// The image is POSTed as `image/png`; the sidecar answers with
/// `{"faces": [{"bbox": [x1, y1, x2, y2], "embedding": [...], "score": 0.98}]}`.
/// No retries are attempted here.
pub struct HttpFaceDetector {
    client: reqwest::Client,
    url: String,
    model_name: String,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    faces: Vec<RemoteFace>,
}

#[derive(Debug, Deserialize)]
struct RemoteFace {
    bbox: [f32; 4],
    embedding: Vec<f32>,
    #[serde(default)]
    score: Option<f32>,
}

impl From<RemoteFace> for DetectedFace {
    fn from(face: RemoteFace) -> Self {
        let [x1, y1, x2, y2] = face.bbox;
        DetectedFace {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            embedding: face.embedding,
            score: face.score,
        }
    }
}

impl HttpFaceDetector {
    pub fn new(
        url: impl Into<String>,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DetectionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DetectionError::Detector(format!("http client init failed: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            model_name: model_name.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FaceDetector for HttpFaceDetector {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn detect(&self, image: &DecodedImage) -> Result<Vec<DetectedFace>, DetectionError> {
        let body = image.to_png_bytes()?;
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "image/png")
            .body(body)
            .send()
            .await
            .map_err(|e| DetectionError::Detector(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DetectionError::Detector(format!(
                "HTTP error {status}: {body}"
            )));
        }

        let parsed = response
            .json::<DetectResponse>()
            .await
            .map_err(|e| DetectionError::Detector(format!("invalid detector response: {e}")))?;
        Ok(parsed.faces.into_iter().map(DetectedFace::from).collect())
    }
}
