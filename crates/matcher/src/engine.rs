use std::sync::Arc;
use std::time::Instant;

use embedding::{embedding_from_value, Embedding, EmbeddingPipeline, ValidationError};
use store::RecordStore;
use tracing::{info, warn};

use crate::metrics::metrics_recorder;
use crate::ranker::rank;
use crate::types::{check_threshold, MatchConfig, MatchOutcome, QuerySource, ServiceError};


/// Top-level match orchestration.
///
/// Holds the detector pipeline and store handle built once at startup; each
/// call to [`match_query`](Self::match_query) is an independent unit of work.
#[derive(Clone)]
pub struct MatchService {
    pipeline: EmbeddingPipeline,
    store: Arc<dyn RecordStore>,
    config: MatchConfig,
}

impl MatchService {
    /// Construct a service from explicit collaborators. The config is
    /// validated here so misconfiguration fails at startup.
    pub fn new(
        pipeline: EmbeddingPipeline,
        store: Arc<dyn RecordStore>,
        config: MatchConfig,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        if pipeline.expected_dim() != config.dimension {
            return Err(ServiceError::InvalidConfig(format!(
                "pipeline dimension {} does not match configured dimension {}",
                pipeline.expected_dim(),
                config.dimension
            )));
        }
        Ok(Self {
            pipeline,
            store,
            config,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &EmbeddingPipeline {
        &self.pipeline
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Match a query against every stored record.
    ///
    /// `threshold` defaults to the configured value. It is checked before the
    /// detector or the store is touched. Query-side failures abort the call;
    /// malformed stored records are skipped.
    pub async fn match_query(
        &self,
        source: QuerySource,
        threshold: Option<f32>,
    ) -> Result<MatchOutcome, ServiceError> {
        let kind = source.kind();
        let start = Instant::now();

        let result = match check_threshold(threshold.unwrap_or(self.config.default_threshold)) {
            Ok(threshold) => match self.config.timeout() {
                Some(budget) => tokio::time::timeout(budget, self.run(source, threshold))
                    .await
                    .unwrap_or(Err(ServiceError::Timeout(budget))),
                None => self.run(source, threshold).await,
            },
            Err(err) => Err(err),
        };

        let recorder = metrics_recorder();
        match &result {
            Ok(outcome) => {
                info!(
                    query = kind.as_str(),
                    threshold = outcome.threshold,
                    matches_found = outcome.matches_found,
                    candidates_scanned = outcome.candidates_scanned,
                    candidates_skipped = outcome.candidates_skipped,
                    elapsed_micros = start.elapsed().as_micros(),
                    "match_success"
                );
                if let Some(recorder) = recorder {
                    recorder.record_match(
                        kind,
                        start.elapsed(),
                        outcome.matches_found,
                        outcome.candidates_skipped,
                    );
                }
            }
            Err(err) => {
                warn!(
                    query = kind.as_str(),
                    kind = err.kind(),
                    error = %err,
                    elapsed_micros = start.elapsed().as_micros(),
                    "match_failure"
                );
                if let Some(recorder) = recorder {
                    recorder.record_failure(kind, err.kind());
                }
            }
        }
        result
    }

    /// Turn any query source into a validated unit embedding.
    pub async fn resolve_query(&self, source: QuerySource) -> Result<Embedding, ServiceError> {
        let dim = self.config.dimension;
        match source {
            QuerySource::Embedding(embedding) => {
                if embedding.dim() != dim {
                    return Err(ValidationError::DimensionMismatch {
                        label: "query".into(),
                        expected: dim,
                        actual: embedding.dim(),
                    }
                    .into());
                }
                Ok(embedding)
            }
            QuerySource::Vector(raw) => Ok(embedding_from_value(&raw, dim, "query")?),
            QuerySource::Image(bytes) => Ok(self.pipeline.embed_bytes(&bytes).await?),
        }
    }

    async fn run(&self, source: QuerySource, threshold: f32) -> Result<MatchOutcome, ServiceError> {
        let query = self.resolve_query(source).await?;
        let candidates = self.store.fetch_all(&self.config.collection).await?;
        let ranked = rank(&query, &candidates, threshold, self.config.top_k);

        Ok(MatchOutcome {
            matches_found: ranked.matches.len(),
            matches: ranked.matches,
            threshold,
            candidates_scanned: ranked.scanned,
            candidates_skipped: ranked.skipped,
        })
    }
}
