use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use arrange::{Assignment, ClusterLabel, ClusteredItem, Document};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Documents to cluster.
#[derive(Debug, Deserialize)]
pub struct ClusterRequest {
    pub items: Vec<Document>,
}

/// Per-document assignments.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClusterResponse {
    pub clusters: Vec<Assignment>,
}

/// Pre-clustered documents to name.
#[derive(Debug, Deserialize)]
pub struct CategoriesRequest {
    pub items: Vec<ClusteredItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: BTreeMap<ClusterLabel, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlabeled: Vec<ClusterLabel>,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TitleResponse {
    pub title: String,
}

/// Cluster documents without naming them.
///
/// # Example
/// ```json
/// // Request
/// {"items": [{"title": "AI launch", "summary": "model released today"}]}
///
/// // Response
/// {"clusters": [{"index": 0, "title": "AI launch", "summary": "model released today", "cluster": -1}]}
/// ```
pub async fn cluster_documents(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<ClusterRequest>, JsonRejection>,
) -> ServerResult<Json<ClusterResponse>> {
    let Json(request) = body?;
    let grouping = state.pipeline.assign(&request.items).await?;
    Ok(Json(ClusterResponse {
        clusters: grouping.assignments,
    }))
}

/// Cluster documents and name every non-noise cluster. Clusters whose
/// naming failed are listed under `unlabeled`; the request still succeeds.
pub async fn categorize_documents(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<ClusterRequest>, JsonRejection>,
) -> ServerResult<Json<arrange::ClusterResponse>> {
    let Json(request) = body?;
    let response = state.pipeline.run(&request.items).await?;
    Ok(Json(response))
}

/// Name clusters assigned by an earlier `/api/v1/cluster` call.
pub async fn name_categories(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<CategoriesRequest>, JsonRejection>,
) -> ServerResult<Json<CategoriesResponse>> {
    let Json(request) = body?;
    let names = state.pipeline.name_clusters(&request.items).await?;
    Ok(Json(CategoriesResponse {
        categories: names.categories,
        unlabeled: names.unlabeled,
    }))
}

/// Title one summary in its own language.
pub async fn generate_title(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<TitleRequest>, JsonRejection>,
) -> ServerResult<Json<TitleResponse>> {
    let Json(request) = body?;
    if request.summary.trim().is_empty() {
        return Err(ServerError::BadRequest("summary must not be empty".into()));
    }

    let timeout = state.pipeline.config().label_timeout;
    let title = tokio::time::timeout(timeout, state.titler.generate_title(&request.summary))
        .await
        .map_err(|_| arrange::NamingError::Timeout(timeout))??;
    Ok(Json(TitleResponse { title }))
}
