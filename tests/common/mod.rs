#![allow(dead_code)]

use std::sync::Arc;

use arrange::{
    ClusterConfig, ClusterPipeline, ClusteringStrategy, DbscanParams, Document, Embedder,
    LabelGenerator, NamingError, PipelineConfig, SemanticError,
};
use async_trait::async_trait;

const VOCAB: [&str; 8] = [
    "ai", "model", "released", "stock", "market", "shares", "fall", "recipe",
];

/// Bag-of-keywords embedder: one dimension per vocabulary word plus a
/// constant dimension.
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let words: Vec<&str> = lower.split_whitespace().collect();
                let mut v: Vec<f32> = VOCAB
                    .iter()
                    .map(|w| words.iter().filter(|x| *x == w).count() as f32)
                    .collect();
                v.push(0.25);
                v
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "keywords"
    }
}

/// Returns the part of the first sample before the colon; fails when any
/// sample mentions `poison`.
pub struct EchoLabeler;

#[async_trait]
impl LabelGenerator for EchoLabeler {
    async fn generate_label(&self, samples: &[String]) -> Result<String, NamingError> {
        if samples.iter().any(|s| s.to_lowercase().contains("poison")) {
            return Err(NamingError::Request("HTTP error 500".into()));
        }
        let first = samples.first().ok_or(NamingError::Empty)?;
        Ok(first.split(':').next().unwrap_or_default().to_string())
    }
}

pub fn fixed_radius(eps: f32, min_samples: usize) -> ClusterConfig {
    ClusterConfig::default().with_clustering(ClusteringStrategy::FixedRadius(DbscanParams {
        eps,
        min_samples,
        ..DbscanParams::default()
    }))
}

pub fn pipeline(cluster: ClusterConfig) -> ClusterPipeline {
    pipeline_with(Arc::new(KeywordEmbedder), cluster)
}

pub fn pipeline_with(embedder: Arc<dyn Embedder>, cluster: ClusterConfig) -> ClusterPipeline {
    ClusterPipeline::new(
        embedder,
        Arc::new(EchoLabeler),
        PipelineConfig::default().with_cluster(cluster),
    )
    .expect("valid pipeline")
}

pub fn scenario_docs() -> Vec<Document> {
    vec![
        Document::new("AI breakthrough", "new model released"),
        Document::new("AI launch", "model released today"),
        Document::new("Stock market dips", "shares fall sharply"),
    ]
}
