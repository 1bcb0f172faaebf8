use arrange::{ArrangeConfig, Document, NOISE};

fn bookmarks() -> Vec<Document> {
    vec![
        Document::new("Rust async book", "futures and executors explained"),
        Document::new("Rust async patterns", "futures and executors in practice"),
        Document::new("Sourdough starter", "feeding schedule for bread"),
        Document::new("Sourdough bread", "feeding schedule and baking"),
        Document::new("Quarterly earnings", "stock market reaction"),
    ]
}

#[tokio::test]
async fn offline_pipeline_names_every_cluster() {
    let pipeline = ArrangeConfig::offline().build_pipeline().unwrap();
    assert_eq!(pipeline.model_name(), "all-MiniLM-L6-v2");

    let docs = bookmarks();
    let response = pipeline.run(&docs).await.unwrap();

    assert_eq!(response.clusters.len(), docs.len());
    assert!(response.unlabeled.is_empty());
    let mut clusters: Vec<i32> = response
        .clusters
        .iter()
        .map(|a| a.cluster)
        .filter(|&c| c != NOISE)
        .collect();
    clusters.sort_unstable();
    clusters.dedup();
    assert_eq!(clusters.len(), response.categories.len());
    assert!(response.categories.values().all(|name| !name.trim().is_empty()));
}

#[tokio::test]
async fn offline_yaml_with_variable_density_runs() {
    let yaml = r#"
version: "1.0"
semantic:
  mode: fast
  tier: fast
naming:
  mode: stub
clustering:
  normalization: l2
  clustering:
    strategy: variable_density
    min_cluster_size: 2
"#;
    let pipeline = ArrangeConfig::from_yaml(yaml)
        .unwrap()
        .build_pipeline()
        .unwrap();

    let docs = vec![Document::new("Same page", "same summary"); 4];
    let response = pipeline.run(&docs).await.unwrap();
    assert!(response.clusters.iter().all(|a| a.cluster == 0));
    assert_eq!(response.categories.len(), 1);
}
