//! Workspace umbrella crate for face embedding matching.
//!
//! This crate stitches together the embedding primitives, the record store and
//! the matcher so callers can build and drive a complete matching pipeline
//! from one place, usually from a YAML [`FacematchConfig`].
//!
//! ```
//! use facematch::{FacematchConfig, QuerySource, embedding_from_value};
//!
//! let config = FacematchConfig::local();
//! let service = config.build_match_service().unwrap();
//! assert_eq!(service.config().default_threshold, 0.55);
//!
//! let raw = serde_json::json!(vec![0.5_f32; 512]);
//! let query = embedding_from_value(&raw, 512, "query").unwrap();
//! let _source = QuerySource::Embedding(query);
//! ```

pub mod config;

pub use config::{
    ConfigLoadError, EmbeddingYamlConfig, FacematchConfig, MatchYamlConfig, StoreYamlConfig,
};
pub use embedding::{
    BoundingBox, DecodedImage, DetectedFace, DetectionError, EMBEDDING_DIM, Embedding,
    EmbeddingPipeline, FaceDetector, HttpFaceDetector, StubFaceDetector, ValidatedVector,
    ValidationError, decode_image, embedding_from_value, normalize, score, select_largest_face,
    validate, validate_slice,
};
pub use matcher::{
    CandidateMetadata, DEFAULT_THRESHOLD, DEFAULT_TOP_K, Match, MatchConfig, MatchMetrics,
    MatchOutcome, MatchService, QueryKind, QuerySource, RankOutcome, ServiceError,
    candidate_embedding, check_threshold, rank, set_match_metrics,
};
pub use store::{
    DEFAULT_COLLECTION, FirebaseStore, InMemoryStore, JsonFileStore, RecordStore, StoreConfig,
    StoreError, StoredDocument,
};

/// Rank pre-fetched documents against a raw query vector in one call.
///
/// The query goes through validation and normalization first; a bad query
/// fails the call, while bad documents are skipped by [`rank`].
pub fn match_documents(
    query: &serde_json::Value,
    documents: &[StoredDocument],
    threshold: f32,
) -> Result<RankOutcome, ServiceError> {
    let threshold = check_threshold(threshold)?;
    let query = embedding_from_value(query, EMBEDDING_DIM, "query")?;
    Ok(rank(&query, documents, threshold, DEFAULT_TOP_K))
}
