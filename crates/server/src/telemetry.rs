//! Prometheus export of pipeline and HTTP metrics.

use std::sync::Arc;
use std::time::Duration;

use arrange::{ClusterError, NamingError, PipelineMetrics, SemanticError};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the process-wide Prometheus recorder once and return its handle.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    PROMETHEUS
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .cloned()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))
}

fn outcome<E>(result: &Result<(), E>) -> &'static str {
    if result.is_ok() {
        "ok"
    } else {
        "error"
    }
}

/// Forwards pipeline stage events to the `metrics` facade.
#[derive(Debug, Default)]
pub struct PrometheusPipelineMetrics;

impl PrometheusPipelineMetrics {
    pub fn shared() -> Arc<dyn PipelineMetrics> {
        Arc::new(Self)
    }
}

impl PipelineMetrics for PrometheusPipelineMetrics {
    fn record_embed(&self, latency: Duration, documents: usize, result: Result<(), SemanticError>) {
        let outcome = outcome(&result);
        histogram!("arrange_embed_seconds", "outcome" => outcome).record(latency.as_secs_f64());
        counter!("arrange_embedded_documents_total", "outcome" => outcome)
            .increment(documents as u64);
    }

    fn record_cluster(&self, latency: Duration, result: Result<(), ClusterError>) {
        let outcome = outcome(&result);
        histogram!("arrange_cluster_seconds", "outcome" => outcome).record(latency.as_secs_f64());
    }

    fn record_label(&self, latency: Duration, result: Result<(), NamingError>) {
        let reason = match &result {
            Ok(()) => "ok",
            Err(NamingError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        histogram!("arrange_label_seconds", "outcome" => reason).record(latency.as_secs_f64());
        counter!("arrange_labels_total", "outcome" => reason).increment(1);
    }

    fn record_grouping(&self, clusters: usize, noise: usize) {
        gauge!("arrange_last_cluster_count").set(clusters as f64);
        gauge!("arrange_last_noise_count").set(noise as f64);
        counter!("arrange_noise_documents_total").increment(noise as u64);
    }
}

/// Per-request HTTP counters, fed by the logging middleware.
pub fn record_http(method: &str, status: u16, latency: Duration) {
    let status = status.to_string();
    counter!("arrange_http_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
    histogram!("arrange_http_request_seconds", "method" => method.to_string())
        .record(latency.as_secs_f64());
}
