use std::time::Duration;

use embedding::{DetectionError, Embedding, ValidationError, EMBEDDING_DIM};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use store::{StoreError, DEFAULT_COLLECTION};
use thiserror::Error;

/// Similarity threshold used when a request does not supply one.
pub const DEFAULT_THRESHOLD: f32 = 0.55;

/// Maximum number of matches returned per request.
pub const DEFAULT_TOP_K: usize = 5;

/// Service-wide matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    /// Threshold applied when the caller omits one. Must lie in `[0, 1]`.
    #[serde(default = "MatchConfig::default_threshold")]
    pub default_threshold: f32,
    /// Maximum matches returned.
    #[serde(default = "MatchConfig::default_top_k")]
    pub top_k: usize,
    /// Store collection holding enrolled embeddings.
    #[serde(default = "MatchConfig::default_collection")]
    pub collection: String,
    /// Required embedding dimension for queries and candidates.
    #[serde(default = "MatchConfig::default_dimension")]
    pub dimension: usize,
    /// Optional budget for one whole match call (detector + store + ranking).
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl MatchConfig {
    pub(crate) fn default_threshold() -> f32 {
        DEFAULT_THRESHOLD
    }

    pub(crate) fn default_top_k() -> usize {
        DEFAULT_TOP_K
    }

    pub(crate) fn default_collection() -> String {
        DEFAULT_COLLECTION.to_string()
    }

    pub(crate) fn default_dimension() -> usize {
        EMBEDDING_DIM
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration once at startup.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(ServiceError::InvalidConfig(
                "default_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(ServiceError::InvalidConfig(
                "top_k must be greater than zero".into(),
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "collection must not be empty".into(),
            ));
        }
        if self.dimension == 0 {
            return Err(ServiceError::InvalidConfig(
                "dimension must be greater than zero".into(),
            ));
        }
        if self.timeout_ms == Some(0) {
            return Err(ServiceError::InvalidConfig(
                "timeout_ms must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            collection: DEFAULT_COLLECTION.to_string(),
            dimension: EMBEDDING_DIM,
            timeout_ms: None,
        }
    }
}

/// Where the query embedding comes from.
#[derive(Debug, Clone)]
pub enum QuerySource {
    /// Already validated and normalized at the caller boundary.
    Embedding(Embedding),
    /// Loosely-typed vector straight from a request body.
    Vector(Value),
    /// Encoded image bytes to run through the embedding pipeline.
    Image(Vec<u8>),
}

impl QuerySource {
    pub fn kind(&self) -> QueryKind {
        match self {
            QuerySource::Embedding(_) | QuerySource::Vector(_) => QueryKind::Embedding,
            QuerySource::Image(_) => QueryKind::Image,
        }
    }
}

/// Coarse query type used for logs and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Embedding,
    Image,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Embedding => "embedding",
            QueryKind::Image => "image",
        }
    }
}

/// Optional descriptive fields copied from a stored record.
///
/// Fields with an unexpected type are dropped rather than failing the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "imageUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

impl CandidateMetadata {
    pub fn from_document(document: &Value) -> Self {
        let text = |key: &str| document.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            name: text("name"),
            age: match document.get("age") {
                Some(Value::Number(n)) => Some(n.clone()),
                _ => None,
            },
            description: text("description"),
            image_url: text("imageUrl"),
        }
    }
}

/// A candidate that scored at or above the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub person_id: String,
    pub similarity: f32,
    #[serde(flatten)]
    pub metadata: CandidateMetadata,
}

/// Result of one match call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    /// Ordered by descending similarity, at most `top_k` entries.
    pub matches: Vec<Match>,
    /// Threshold actually applied.
    pub threshold: f32,
    pub matches_found: usize,
    /// Documents read from the store.
    pub candidates_scanned: usize,
    /// Documents dropped because their embedding was unusable.
    pub candidates_skipped: usize,
}

/// Errors produced by the match service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Per-request threshold outside `[0, 1]`.
    #[error("threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f32),
    /// Service configuration rejected at startup.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The query could not be turned into an embedding.
    #[error(transparent)]
    Query(#[from] DetectionError),
    /// Fetching candidates from the store failed.
    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    /// The whole call exceeded its configured budget.
    #[error("match timed out after {0:?}")]
    Timeout(Duration),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Query(DetectionError::Validation(err))
    }
}

impl ServiceError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidThreshold(_) => "InvalidThreshold",
            ServiceError::InvalidConfig(_) => "InvalidConfig",
            ServiceError::Query(DetectionError::Decode(_)) => "DecodeError",
            ServiceError::Query(DetectionError::NoFaceDetected) => "NoFaceDetected",
            ServiceError::Query(DetectionError::DimensionMismatch { .. }) => "DimensionMismatch",
            ServiceError::Query(DetectionError::Validation(v)) => v.kind(),
            ServiceError::Query(DetectionError::Detector(_)) => "DetectorUnavailable",
            ServiceError::StoreUnavailable(_) => "StoreUnavailable",
            ServiceError::Timeout(_) => "Timeout",
        }
    }
}

/// Reject thresholds outside `[0, 1]`, including NaN.
pub fn check_threshold(threshold: f32) -> Result<f32, ServiceError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ServiceError::InvalidThreshold(threshold))
    }
}
