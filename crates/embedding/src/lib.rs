//! Face embedding primitives.
//!
//! Everything that touches a single feature vector lives here:
//!
//! - [`validate`] / [`validate_slice`] check shape and finiteness.
//! - [`normalize`] rescales to unit L2 norm, producing an [`Embedding`].
//! - [`score`] is cosine similarity between two unit embeddings (a dot product).
//! - [`EmbeddingPipeline`] turns image bytes into an [`Embedding`] through a
//!   pluggable [`FaceDetector`], keeping the largest detected face.
//!
//! Validation, normalization and scoring are pure and safe to call from any
//! number of concurrent requests. The detector is the only external call.
//!
//! ## Quick example
//!
//! ```
//! use embedding::{normalize, score, validate_slice};
//!
//! let a = normalize(validate_slice(&[3.0, 4.0], 2, "a").unwrap()).unwrap();
//! let b = normalize(validate_slice(&[6.0, 8.0], 2, "b").unwrap()).unwrap();
//! assert!((score(&a, &b) - 1.0).abs() < 1e-6);
//! ```
//!
//! ## Detectors
//!
//! - [`HttpFaceDetector`] forwards the image to an inference sidecar.
//! - [`StubFaceDetector`] derives a stable vector from the pixels; handy for
//!   local development and tests.

pub mod error;
pub mod pipeline;
pub mod types;

mod normalize;
mod remote;
mod score;
mod stub;
mod validate;

pub use crate::error::{DetectionError, ValidationError};
pub use crate::normalize::normalize;
pub use crate::pipeline::{
    decode_image, select_largest_face, BoundingBox, DecodedImage, DetectedFace, EmbeddingPipeline,
    FaceDetector,
};
pub use crate::remote::HttpFaceDetector;
pub use crate::score::{dot, score};
pub use crate::stub::StubFaceDetector;
pub use crate::types::{Embedding, ValidatedVector, EMBEDDING_DIM};
pub use crate::validate::{validate, validate_slice};

/// Validate then normalize in one step.
pub fn embedding_from_value(
    raw: &serde_json::Value,
    expected_dim: usize,
    label: &str,
) -> Result<Embedding, ValidationError> {
    normalize(validate(raw, expected_dim, label)?)
}
