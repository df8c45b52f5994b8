use async_trait::async_trait;
use fxhash::hash64;

use crate::error::DetectionError;
use crate::pipeline::{BoundingBox, DecodedImage, DetectedFace, FaceDetector};
use crate::types::EMBEDDING_DIM;

/// Deterministic stand-in for the recognition model.
///
/// Reports a single face covering the whole frame whose feature vector is
/// derived from a hash of the pixels, so identical images always embed to
/// identical vectors. Images made of a single flat colour report no faces.
#[derive(Debug, Clone)]
pub struct StubFaceDetector {
    model_name: String,
    dim: usize,
}

impl StubFaceDetector {
    pub fn new() -> Self {
        Self::with_dimension(EMBEDDING_DIM)
    }

    pub fn with_dimension(dim: usize) -> Self {
        Self {
            model_name: "stub".into(),
            dim,
        }
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }
}

impl Default for StubFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceDetector for StubFaceDetector {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn detect(&self, image: &DecodedImage) -> Result<Vec<DetectedFace>, DetectionError> {
        let rgb = image.as_dynamic().to_rgb8();
        let mut pixels = rgb.pixels();
        let first = pixels.next().copied();
        if first.is_none() || pixels.all(|p| Some(*p) == first) {
            return Ok(Vec::new());
        }

        let h = hash64(rgb.as_raw());
        let embedding = (0..self.dim)
            .map(|idx| {
                let x = hash64(&(h, idx as u64));
                ((x as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32
            })
            .collect();

        Ok(vec![DetectedFace {
            bbox: BoundingBox::new(0.0, 0.0, image.width() as f32, image.height() as f32),
            embedding,
            score: Some(1.0),
        }])
    }
}
