// Metrics hooks for the matcher crate.
//
// Callers install a global `MatchMetrics` implementation via [`set_match_metrics`];
// `MatchService` then reports latency, hit counts and skipped candidates for each
// call to `MatchService::match_query`. This keeps instrumentation decoupled from
// any specific metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::types::QueryKind;

/// Metrics observer for match operations.
pub trait MatchMetrics: Send + Sync {
    /// Record a successful match.
    ///
    /// `hit_count` is the number of matches returned after thresholding and
    /// truncation; `skipped` counts stored records dropped as malformed.
    fn record_match(&self, query: QueryKind, latency: Duration, hit_count: usize, skipped: usize);

    /// Record a failed match, labelled with the error kind.
    fn record_failure(&self, query: QueryKind, error_kind: &'static str);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global match metrics recorder.
///
/// This is typically called once during service startup.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
