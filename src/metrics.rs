use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use cluster::ClusterError;
use naming::NamingError;
use semantic::SemanticError;

/// Observer for pipeline stages. Installed once per process with
/// [`set_pipeline_metrics`]; the server feeds it into Prometheus.
pub trait PipelineMetrics: Send + Sync {
    fn record_embed(&self, latency: Duration, documents: usize, result: Result<(), SemanticError>);
    fn record_cluster(&self, latency: Duration, result: Result<(), ClusterError>);
    /// One call per cluster naming attempt, timeouts included.
    fn record_label(&self, latency: Duration, result: Result<(), NamingError>);
    /// Shape of a successful grouping.
    fn record_grouping(&self, _clusters: usize, _noise: usize) {}
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Times one stage and reports it to the installed recorder, if any.
pub(crate) struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_embed(self, documents: usize, result: Result<(), SemanticError>) {
        self.recorder
            .record_embed(self.start.elapsed(), documents, result);
    }

    pub(crate) fn record_cluster(self, result: Result<(), ClusterError>) {
        self.recorder.record_cluster(self.start.elapsed(), result);
    }

    pub(crate) fn record_label(self, result: Result<(), NamingError>) {
        self.recorder.record_label(self.start.elapsed(), result);
    }
}
