//! Prometheus wiring for the match service.
//!
//! The exporter is installed at most once per process; later calls hand back
//! the same handle so several `ServerState`s (tests, embedded servers) can
//! share it.

use std::sync::Arc;
use std::time::Duration;

use matcher::{set_match_metrics, MatchMetrics, QueryKind};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder and the match metrics adapter.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PROMETHEUS.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe_metrics();
        set_match_metrics(Some(Arc::new(PrometheusMatchMetrics)));
        Ok::<_, anyhow::Error>(handle)
    })?;
    Ok(handle.clone())
}

fn describe_metrics() {
    describe_counter!(
        "facematch_match_requests_total",
        "Match requests by query type and outcome"
    );
    describe_histogram!(
        "facematch_match_latency_seconds",
        "End-to-end latency of successful match requests"
    );
    describe_histogram!(
        "facematch_matches_returned",
        "Matches returned per successful request"
    );
    describe_counter!(
        "facematch_candidates_skipped_total",
        "Stored records skipped because their embedding was unusable"
    );
    describe_counter!(
        "facematch_embedding_requests_total",
        "Embedding generation requests by outcome"
    );
}

/// Forwards match observations to the `metrics` facade.
pub struct PrometheusMatchMetrics;

impl MatchMetrics for PrometheusMatchMetrics {
    fn record_match(&self, query: QueryKind, latency: Duration, hit_count: usize, skipped: usize) {
        counter!(
            "facematch_match_requests_total",
            "query" => query.as_str(),
            "outcome" => "success"
        )
        .increment(1);
        histogram!("facematch_match_latency_seconds", "query" => query.as_str())
            .record(latency.as_secs_f64());
        histogram!("facematch_matches_returned").record(hit_count as f64);
        counter!("facematch_candidates_skipped_total").increment(skipped as u64);
    }

    fn record_failure(&self, query: QueryKind, error_kind: &'static str) {
        counter!(
            "facematch_match_requests_total",
            "query" => query.as_str(),
            "outcome" => "failure",
            "error" => error_kind
        )
        .increment(1);
    }
}

/// Count one `/generate-embedding` call.
pub fn record_embedding_request(outcome: &'static str) {
    counter!("facematch_embedding_requests_total", "outcome" => outcome).increment(1);
}
