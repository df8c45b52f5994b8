//! # Face matcher (`matcher`)
//!
//! Query-time matching of one face embedding against every enrolled record in
//! a store.
//!
//! ## Flow
//!
//! 1. [`MatchService::match_query`] checks the threshold (`[0, 1]`).
//! 2. The query is resolved into a unit [`Embedding`](embedding::Embedding):
//!    an already-normalized vector, a raw JSON vector, or image bytes run
//!    through the [`EmbeddingPipeline`](embedding::EmbeddingPipeline).
//! 3. All documents of the configured collection are fetched from the
//!    [`RecordStore`](store::RecordStore).
//! 4. [`rank`] validates, normalizes and scores each candidate, keeps scores
//!    at or above the threshold, sorts descending (stable) and truncates to
//!    `top_k`.
//!
//! Any failure on the query side aborts the call. A malformed stored record
//! is logged and skipped; the rest of the collection is still ranked.
//!
//! ## Metrics
//!
//! Install a [`MatchMetrics`] implementation with [`set_match_metrics`] to
//! observe latency, hit counts and skipped candidates per call.

pub mod engine;
pub mod metrics;
pub mod ranker;
pub mod types;

pub use crate::engine::MatchService;
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::ranker::{candidate_embedding, rank, RankOutcome};
pub use crate::types::{
    check_threshold, CandidateMetadata, Match, MatchConfig, MatchOutcome, QueryKind, QuerySource,
    ServiceError, DEFAULT_THRESHOLD, DEFAULT_TOP_K,
};
