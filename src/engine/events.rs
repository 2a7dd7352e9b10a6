//! Mutation batches and the self-caused predicate.

use super::filter;
use crate::dom::{Document, MutationKind, MutationRecord, NodeId};

/// Whether `record` was produced by the engine's own writes.
///
/// True when an added node is a wrapper or contains one, or when the target
/// is a wrapper or lies inside one.
#[must_use]
pub fn is_self_caused(doc: &Document, record: &MutationRecord) -> bool {
    if filter::is_within_wrapper(doc, record.target) {
        return true;
    }
    record
        .added_nodes
        .iter()
        .any(|&added| contains_wrapper(doc, added))
}

fn contains_wrapper(doc: &Document, id: NodeId) -> bool {
    filter::is_wrapper(doc, id) || doc.descendants(id).any(|d| filter::is_wrapper(doc, d))
}

/// Records delivered together to the watcher.
#[derive(Debug, Default)]
pub struct MutationBatch {
    records: Vec<MutationRecord>,
}

impl MutationBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Only child-list records take part in rescans.
    pub fn add(&mut self, record: MutationRecord) {
        if record.kind == MutationKind::ChildList {
            self.records.push(record);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds foreign content worth a rescan.
    #[must_use]
    pub fn should_rescan(&self, doc: &Document) -> bool {
        self.records
            .iter()
            .any(|r| r.has_additions() && !is_self_caused(doc, r))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
