use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cluster::{
    cluster_embeddings, group_documents, Assignment, ClusterConfig, ClusterLabel, Document,
    Grouping, NOISE,
};
use futures::stream::{self, StreamExt};
use naming::{LabelGenerator, NamingError};
use semantic::{Embedder, SemanticError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{metrics_recorder, MetricsSpan};
use crate::PipelineError;

/// Request-independent pipeline settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub cluster: ClusterConfig,
    /// Upper bound for one cluster's naming call, retries included.
    pub label_timeout: Duration,
    /// Naming calls in flight per request; `0` behaves as `1`.
    pub max_concurrent_labels: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            label_timeout: Duration::from_secs(20),
            max_concurrent_labels: 8,
        }
    }
}

impl PipelineConfig {
    pub fn with_cluster(mut self, cluster: ClusterConfig) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_label_timeout(mut self, timeout: Duration) -> Self {
        self.label_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_labels(mut self, limit: usize) -> Self {
        self.max_concurrent_labels = limit;
        self
    }
}

/// Names produced for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNames {
    /// Cluster label to generated name, successful clusters only.
    pub categories: BTreeMap<ClusterLabel, String>,
    /// Clusters whose naming failed or timed out, ascending.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlabeled: Vec<ClusterLabel>,
}

/// Full clustering response: assignments plus whatever names came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterResponse {
    pub clusters: Vec<Assignment>,
    pub categories: BTreeMap<ClusterLabel, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlabeled: Vec<ClusterLabel>,
}

/// A document that already carries a cluster label, e.g. from an earlier
/// `assign` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteredItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub summary: String,
    pub cluster: ClusterLabel,
}

impl ClusteredItem {
    fn snippet(&self) -> String {
        format!("{}: {}", self.title, self.summary)
    }
}

/// Embed, cluster, group and name a batch of documents.
///
/// Holds shared handles only, so one pipeline serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct ClusterPipeline {
    embedder: Arc<dyn Embedder>,
    labeler: Arc<dyn LabelGenerator>,
    config: PipelineConfig,
}

impl std::fmt::Debug for ClusterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterPipeline")
            .field("model", &self.embedder.model_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn validate_documents(docs: &[Document]) -> Result<(), PipelineError> {
    if docs.is_empty() {
        return Err(PipelineError::Input(
            "at least one document is required".into(),
        ));
    }
    if let Some(index) = docs
        .iter()
        .position(|d| d.title.trim().is_empty() && d.summary.trim().is_empty())
    {
        return Err(PipelineError::Input(format!(
            "document {index} has neither a title nor a summary"
        )));
    }
    Ok(())
}

impl ClusterPipeline {
    /// Validates the clustering parameters once, up front.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        labeler: Arc<dyn LabelGenerator>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.cluster.validate()?;
        Ok(Self {
            embedder,
            labeler,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Cluster `docs` without naming anything.
    ///
    /// Clustering and grouping run on tokio's blocking pool.
    pub async fn assign(&self, docs: &[Document]) -> Result<Grouping, PipelineError> {
        validate_documents(docs)?;
        let vectors = self.embed(docs).await?;

        let span = MetricsSpan::start();
        let config = self.config.cluster.clone();
        let owned = docs.to_vec();
        let result = tokio::task::spawn_blocking(move || {
            cluster_embeddings(&vectors, &config)
                .and_then(|labels| group_documents(&owned, &labels, config.sample_cap))
        })
        .await
        .map_err(|err| PipelineError::Worker(err.to_string()))?;
        if let Some(span) = span {
            span.record_cluster(result.as_ref().map(|_| ()).map_err(Clone::clone));
        }
        let grouping = result?;

        if let Some(recorder) = metrics_recorder() {
            recorder.record_grouping(grouping.cluster_count(), grouping.noise_count());
        }
        info!(
            documents = docs.len(),
            clusters = grouping.cluster_count(),
            noise = grouping.noise_count(),
            "assigned clusters"
        );
        Ok(grouping)
    }

    async fn embed(&self, docs: &[Document]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let texts: Vec<String> = docs.iter().map(Document::embedding_text).collect();

        let span = MetricsSpan::start();
        let result = self
            .embedder
            .embed_batch(&texts)
            .await
            .and_then(|vectors| {
                if vectors.len() == docs.len() {
                    Ok(vectors)
                } else {
                    Err(SemanticError::Inference(format!(
                        "embedder returned {} vectors for {} documents",
                        vectors.len(),
                        docs.len()
                    )))
                }
            });
        if let Some(span) = span {
            span.record_embed(docs.len(), result.as_ref().map(|_| ()).map_err(Clone::clone));
        }
        Ok(result?)
    }

    /// Name every non-noise group. Never fails: clusters whose naming
    /// errors or times out are listed in [`CategoryNames::unlabeled`].
    pub async fn name_groups(&self, grouping: &Grouping) -> CategoryNames {
        let work = grouping
            .groups
            .values()
            .map(|group| (group.label, group.samples.clone()))
            .collect();
        self.name_samples(work).await
    }

    /// Name clusters the caller already assigned. `-1` items are skipped.
    pub async fn name_clusters(
        &self,
        items: &[ClusteredItem],
    ) -> Result<CategoryNames, PipelineError> {
        if items.is_empty() {
            return Err(PipelineError::Input("at least one item is required".into()));
        }

        let cap = self.config.cluster.sample_cap;
        let mut groups: BTreeMap<ClusterLabel, Vec<String>> = BTreeMap::new();
        for item in items.iter().filter(|item| item.cluster != NOISE) {
            let samples = groups.entry(item.cluster).or_default();
            if samples.len() < cap {
                samples.push(item.snippet());
            }
        }

        Ok(self.name_samples(groups.into_iter().collect()).await)
    }

    /// Assign and name in one go.
    pub async fn run(&self, docs: &[Document]) -> Result<ClusterResponse, PipelineError> {
        let grouping = self.assign(docs).await?;
        let names = self.name_groups(&grouping).await;
        Ok(ClusterResponse {
            clusters: grouping.assignments,
            categories: names.categories,
            unlabeled: names.unlabeled,
        })
    }

    async fn name_samples(&self, work: Vec<(ClusterLabel, Vec<String>)>) -> CategoryNames {
        let limit = self.config.max_concurrent_labels.max(1);
        let timeout = self.config.label_timeout;
        let labeler = &self.labeler;

        let outcomes: Vec<(ClusterLabel, Result<String, NamingError>)> = stream::iter(work)
            .map(|(label, samples)| async move {
                let span = MetricsSpan::start();
                let result =
                    match tokio::time::timeout(timeout, labeler.generate_label(&samples)).await {
                        Ok(result) => result,
                        Err(_) => Err(NamingError::Timeout(timeout)),
                    };
                if let Some(span) = span {
                    span.record_label(result.as_ref().map(|_| ()).map_err(Clone::clone));
                }
                (label, result)
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        let mut names = CategoryNames::default();
        for (label, result) in outcomes {
            match result {
                Ok(name) => {
                    debug!(cluster = label, name = %name, "named cluster");
                    names.categories.insert(label, name);
                }
                Err(err) => {
                    warn!(cluster = label, error = %err, "cluster left unlabeled");
                    names.unlabeled.push(label);
                }
            }
        }
        names.unlabeled.sort_unstable();
        names
    }
}
