//! Deduplication bookkeeping.
//!
//! Two structures keep repeated scans from doing repeated work:
//! - the processed-unit set, holding handles of text units already scanned
//! - the annotation-key log, holding every match that was wrapped
//!
//! Both store [`NodeId`] handles only. A handle never keeps its node alive,
//! and [`DedupRegistry::prune`] drops entries whose node has been reclaimed.

use std::collections::HashSet;

use crate::dom::{Document, NodeId};

/// Identity of one wrapped match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationKey {
    unit: NodeId,
    text_digest: blake3::Hash,
    offset: usize,
    matched: String,
}

impl AnnotationKey {
    /// Key for the match at `offset` in `unit`, whose full text is `text`.
    #[must_use]
    pub fn new(unit: NodeId, text: &str, offset: usize, matched: &str) -> Self {
        Self {
            unit,
            text_digest: blake3::hash(text.as_bytes()),
            offset,
            matched: matched.to_string(),
        }
    }

    #[must_use]
    pub const fn unit(&self) -> NodeId {
        self.unit
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn matched(&self) -> &str {
        &self.matched
    }
}

/// Processed units and wrapped matches.
#[derive(Debug, Default)]
pub struct DedupRegistry {
    processed: HashSet<NodeId>,
    annotated: HashSet<AnnotationKey>,
}

impl DedupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `unit` has already been scanned.
    #[must_use]
    pub fn is_processed(&self, unit: NodeId) -> bool {
        self.processed.contains(&unit)
    }

    /// Remember that `unit` has been scanned.
    pub fn mark_processed(&mut self, unit: NodeId) {
        self.processed.insert(unit);
    }

    /// Whether the match identified by `key` was already wrapped.
    #[must_use]
    pub fn is_annotated(&self, key: &AnnotationKey) -> bool {
        self.annotated.contains(key)
    }

    /// Record `key`; returns `false` if it was already present.
    pub fn record_annotation(&mut self, key: AnnotationKey) -> bool {
        self.annotated.insert(key)
    }

    /// Number of processed units tracked.
    #[must_use]
    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    /// Number of annotation keys recorded.
    #[must_use]
    pub fn annotated_len(&self) -> usize {
        self.annotated.len()
    }

    /// Drop entries whose node the document has reclaimed.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self, doc: &Document) -> usize {
        let before = self.processed.len() + self.annotated.len();
        self.processed.retain(|id| doc.contains(*id));
        self.annotated.retain(|key| doc.contains(key.unit));
        let removed = before - (self.processed.len() + self.annotated.len());
        if removed > 0 {
            tracing::debug!(removed, "Pruned registry entries for reclaimed nodes");
        }
        removed
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.processed.clear();
        self.annotated.clear();
    }
}
