//! Image → embedding adapter over an external face detector.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::DetectionError;
use crate::normalize::normalize;
use crate::types::{Embedding, EMBEDDING_DIM};
use crate::validate::validate_slice;

/// Axis-aligned face box given by its corners `(x1, y1)` and `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// `(x2 - x1) * (y2 - y1)`, exactly as reported by the detector.
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }
}

/// One region returned by a [`FaceDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    /// Opaque feature vector produced by the recognition model.
    pub embedding: Vec<f32>,
    /// Detector confidence, when the model reports one.
    #[serde(default)]
    pub score: Option<f32>,
}

/// Decoded pixel buffer handed to the detector.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    inner: DynamicImage,
}

impl DecodedImage {
    pub fn new(inner: DynamicImage) -> Self {
        Self { inner }
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.inner
    }

    /// Re-encode as PNG, used when shipping the image to a remote detector.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, DetectionError> {
        let mut buf = Vec::new();
        self.inner
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| DetectionError::Detector(format!("png encode failed: {e}")))?;
        Ok(buf)
    }
}

/// External face detection + recognition model.
///
/// Implementations are constructed once at startup and shared across requests,
/// so they must be safe for concurrent use.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Model name surfaced on health endpoints.
    fn model_name(&self) -> &str;

    /// Detect zero or more faces in `image`.
    async fn detect(&self, image: &DecodedImage) -> Result<Vec<DetectedFace>, DetectionError>;
}

/// Decode raw bytes (PNG, JPEG or WebP) into a pixel buffer.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DetectionError> {
    if bytes.is_empty() {
        return Err(DetectionError::Decode("empty image payload".into()));
    }
    image::load_from_memory(bytes)
        .map(DecodedImage::new)
        .map_err(|e| DetectionError::Decode(e.to_string()))
}

/// Pick the face with the largest bounding-box area; ties keep the first one.
///
/// A non-finite area ranks below every finite one, so a broken box only wins
/// when nothing else was detected.
pub fn select_largest_face(faces: &[DetectedFace]) -> Option<&DetectedFace> {
    let rank = |face: &DetectedFace| {
        let area = face.bbox.area();
        if area.is_finite() { area } else { f32::NEG_INFINITY }
    };
    let mut best: Option<&DetectedFace> = None;
    for face in faces {
        match best {
            Some(current) if rank(face) <= rank(current) => {}
            _ => best = Some(face),
        }
    }
    best
}

/// Turns images into validated, unit-length embeddings.
#[derive(Clone)]
pub struct EmbeddingPipeline {
    detector: Arc<dyn FaceDetector>,
    expected_dim: usize,
}

impl EmbeddingPipeline {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self::with_dimension(detector, EMBEDDING_DIM)
    }

    pub fn with_dimension(detector: Arc<dyn FaceDetector>, expected_dim: usize) -> Self {
        Self {
            detector,
            expected_dim,
        }
    }

    pub fn detector(&self) -> &Arc<dyn FaceDetector> {
        &self.detector
    }

    pub fn expected_dim(&self) -> usize {
        self.expected_dim
    }

    /// Detect faces, keep the largest one, then validate and normalize its vector.
    pub async fn embed(&self, image: &DecodedImage) -> Result<Embedding, DetectionError> {
        let start = Instant::now();
        let faces = self.detector.detect(image).await?;
        debug!(face_count = faces.len(), "faces_detected");

        let Some(face) = select_largest_face(&faces) else {
            warn!(
                width = image.width(),
                height = image.height(),
                "embed_no_face"
            );
            return Err(DetectionError::NoFaceDetected);
        };

        if face.embedding.len() != self.expected_dim {
            warn!(
                expected = self.expected_dim,
                actual = face.embedding.len(),
                model = self.detector.model_name(),
                "embed_dimension_mismatch"
            );
            return Err(DetectionError::DimensionMismatch {
                expected: self.expected_dim,
                actual: face.embedding.len(),
            });
        }

        let vector = validate_slice(&face.embedding, self.expected_dim, "query face")?;
        let embedding = normalize(vector)?;

        info!(
            face_count = faces.len(),
            bbox_area = face.bbox.area(),
            elapsed_micros = start.elapsed().as_micros(),
            "embed_success"
        );
        Ok(embedding)
    }

    /// Decode `bytes` and run [`embed`](Self::embed).
    pub async fn embed_bytes(&self, bytes: &[u8]) -> Result<Embedding, DetectionError> {
        let image = decode_image(bytes)?;
        self.embed(&image).await
    }
}
