use std::collections::BTreeMap;

use crate::error::ClusterError;
use crate::types::{Assignment, ClusterGroup, ClusterLabel, Document, Grouping, NOISE};

/// Partition documents by label.
///
/// Every document appears in `assignments`, noise included. Only non-noise
/// labels get a group; members keep input order and `samples` holds the
/// first `sample_cap` member snippets. The cap bounds label-generation input,
/// never the reported membership.
pub fn group_documents(
    documents: &[Document],
    labels: &[ClusterLabel],
    sample_cap: usize,
) -> Result<Grouping, ClusterError> {
    if documents.len() != labels.len() {
        return Err(ClusterError::LengthMismatch {
            documents: documents.len(),
            labels: labels.len(),
        });
    }

    let mut assignments = Vec::with_capacity(documents.len());
    let mut groups: BTreeMap<ClusterLabel, ClusterGroup> = BTreeMap::new();

    for (index, (doc, &cluster)) in documents.iter().zip(labels).enumerate() {
        assignments.push(Assignment {
            index,
            id: doc.id.clone(),
            title: doc.title.clone(),
            summary: doc.summary.clone(),
            cluster,
        });

        if cluster == NOISE {
            continue;
        }

        let group = groups.entry(cluster).or_insert_with(|| ClusterGroup {
            label: cluster,
            members: Vec::new(),
            samples: Vec::new(),
        });
        group.members.push(index);
        if group.samples.len() < sample_cap {
            group.samples.push(doc.snippet());
        }
    }

    Ok(Grouping {
        assignments,
        groups,
    })
}
