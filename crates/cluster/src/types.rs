use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request-scoped cluster label. Numbers carry no meaning beyond identity.
pub type ClusterLabel = i32;

/// Reserved label for documents that belong to no cluster.
pub const NOISE: ClusterLabel = -1;

/// A bookmark-like document: a title and a short summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-supplied identifier; responses fall back to the positional index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub summary: String,
}

impl Document {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            summary: summary.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Text handed to the embedder.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }

    /// Snippet handed to the label generator.
    pub fn snippet(&self) -> String {
        format!("{}: {}", self.title, self.summary)
    }
}

/// One document's cluster assignment, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Position of the document in the request.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub summary: String,
    /// Assigned label, [`NOISE`] when unclustered.
    pub cluster: ClusterLabel,
}

/// Documents sharing one non-noise label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterGroup {
    pub label: ClusterLabel,
    /// Input positions of every member, ascending.
    pub members: Vec<usize>,
    /// First `sample_cap` member snippets, used as label-generation input.
    pub samples: Vec<String>,
}

impl ClusterGroup {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Grouper output: the per-document list plus the non-noise groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub assignments: Vec<Assignment>,
    pub groups: BTreeMap<ClusterLabel, ClusterGroup>,
}

impl Grouping {
    pub fn noise_count(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.cluster == NOISE)
            .count()
    }

    pub fn cluster_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_text_forms() {
        let doc = Document::new("AI launch", "model released today");
        assert_eq!(doc.embedding_text(), "AI launch model released today");
        assert_eq!(doc.snippet(), "AI launch: model released today");
    }

    #[test]
    fn document_id_is_optional_on_the_wire() {
        let doc: Document =
            serde_json::from_str(r#"{"title":"t","summary":"s"}"#).unwrap();
        assert!(doc.id.is_none());

        let json = serde_json::to_string(&doc.clone().with_id("bm-7")).unwrap();
        assert!(json.contains("\"id\":\"bm-7\""));

        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("\"id\""));
    }
}
