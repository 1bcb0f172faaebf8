mod common;

use std::sync::Arc;

use arrange::{
    ClusterError, ClusteredItem, Document, Embedder, PipelineError, SemanticError, NOISE,
};
use async_trait::async_trait;
use common::{fixed_radius, pipeline, pipeline_with, scenario_docs};

struct Broken(Result<Vec<Vec<f32>>, SemanticError>);

#[async_trait]
impl Embedder for Broken {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        self.0.clone()
    }

    fn model_name(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn failed_naming_leaves_assignments_intact() {
    let mut docs = scenario_docs();
    docs[2] = Document::new("Poison pill", "stock market shares fall");

    let response = pipeline(fixed_radius(0.5, 1)).run(&docs).await.unwrap();

    let labels: Vec<i32> = response.clusters.iter().map(|a| a.cluster).collect();
    assert_eq!(labels, vec![0, 0, 1]);
    assert_eq!(response.categories.len(), 1);
    assert_eq!(response.categories[&0], "AI breakthrough");
    assert_eq!(response.unlabeled, vec![1]);
}

#[tokio::test]
async fn empty_and_blank_requests_are_rejected() {
    let p = pipeline(fixed_radius(0.5, 2));

    let err = p.run(&[]).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");

    let err = p
        .assign(&[Document::new("ok", "fine"), Document::new("  ", "")])
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Input(ref msg) if msg.contains("document 1")));
}

#[tokio::test]
async fn embedder_failure_fails_the_request() {
    let embedder = Broken(Err(SemanticError::CircuitOpen("hf".into())));
    let err = pipeline_with(Arc::new(embedder), fixed_radius(0.5, 2))
        .run(&scenario_docs())
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::Embedding(SemanticError::CircuitOpen("hf".into())));
    assert_eq!(err.code(), "EMBEDDING_FAILED");
}

#[tokio::test]
async fn short_embedding_batch_is_a_contract_violation() {
    let embedder = Broken(Ok(vec![vec![1.0, 0.0]]));
    let err = pipeline_with(Arc::new(embedder), fixed_radius(0.5, 2))
        .assign(&scenario_docs())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Embedding(SemanticError::Inference(_))));
}

#[tokio::test]
async fn ragged_embeddings_are_rejected_by_clustering() {
    let embedder = Broken(Ok(vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0]]));
    let err = pipeline_with(Arc::new(embedder), fixed_radius(0.5, 2))
        .assign(&scenario_docs())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PipelineError::Cluster(ClusterError::DimensionMismatch {
            index: 2,
            expected: 2,
            found: 1,
        })
    );
    assert_eq!(err.code(), "CLUSTERING_FAILED");
}

#[tokio::test]
async fn non_finite_embeddings_are_rejected() {
    let embedder = Broken(Ok(vec![vec![1.0], vec![f32::INFINITY], vec![0.0]]));
    let err = pipeline_with(Arc::new(embedder), fixed_radius(0.5, 2))
        .assign(&scenario_docs())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PipelineError::Cluster(ClusterError::NonFiniteValue { index: 1 })
    );
}

#[test]
fn invalid_parameters_are_caught_at_construction() {
    let err = arrange::ClusterPipeline::new(
        Arc::new(common::KeywordEmbedder),
        Arc::new(common::EchoLabeler),
        arrange::PipelineConfig::default().with_cluster(fixed_radius(0.0, 2)),
    )
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_CLUSTER_CONFIG");
}

#[tokio::test]
async fn categorize_skips_noise_and_reports_failures() {
    let items = vec![
        ClusteredItem {
            id: None,
            title: "Rust async".into(),
            summary: "tokio tips".into(),
            cluster: 4,
        },
        ClusteredItem {
            id: None,
            title: "Stray".into(),
            summary: "noise".into(),
            cluster: NOISE,
        },
        ClusteredItem {
            id: None,
            title: "Poison".into(),
            summary: "bad".into(),
            cluster: 9,
        },
    ];
    let names = pipeline(fixed_radius(0.5, 2))
        .name_clusters(&items)
        .await
        .unwrap();
    assert_eq!(names.categories.len(), 1);
    assert_eq!(names.categories[&4], "Rust async");
    assert_eq!(names.unlabeled, vec![9]);
}
