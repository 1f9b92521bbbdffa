// Metrics hooks for the `matcher` crate.
//
// Callers install a global `QueryMetrics` implementation via
// [`set_query_metrics`]; every `Recommender::recommend` call then reports its
// outcome kind, latency and context size without tying the engine to a
// particular metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for recommendation queries.
pub trait QueryMetrics: Send + Sync {
    /// Record one finished query.
    ///
    /// `kind` is `meta`, `answered` or `failed`, `hit_count` is the number of
    /// documents placed in the prompt context, and `fallback` is set when the
    /// filters matched nothing.
    fn record_query(&self, kind: &str, latency: Duration, hit_count: usize, fallback: bool);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn QueryMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn QueryMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn QueryMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global query metrics recorder.
pub fn set_query_metrics(recorder: Option<Arc<dyn QueryMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
