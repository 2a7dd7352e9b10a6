//! Document scanner for candidate text units.
//!
//! Walks the tree in document order and yields text units that are not yet
//! processed, not inside an excluded context, and hold a postal code.

use std::sync::atomic::{AtomicU64, Ordering};

use super::filter;
use super::matcher::contains_match;
use super::registry::DedupRegistry;
use crate::dom::{Document, NodeData, NodeId};
use crate::settings::ThroughputProfile;

/// Scan statistics.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub units_visited: AtomicU64,
    pub candidates: AtomicU64,
    pub skipped_processed: AtomicU64,
    pub skipped_context: AtomicU64,
    pub without_match: AtomicU64,
}

impl ScanStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            units_visited: self.units_visited.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            skipped_processed: self.skipped_processed.load(Ordering::Relaxed),
            skipped_context: self.skipped_context.load(Ordering::Relaxed),
            without_match: self.without_match.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scan stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStatsSnapshot {
    pub units_visited: u64,
    pub candidates: u64,
    pub skipped_processed: u64,
    pub skipped_context: u64,
    pub without_match: u64,
}

/// Lazy walk over candidate text units.
///
/// Excluded element subtrees are skipped whole. The walk cannot be
/// restarted; build a new one for the next pass.
pub struct Candidates<'a> {
    doc: &'a Document,
    registry: &'a DedupRegistry,
    stats: &'a ScanStats,
    stack: Vec<NodeId>,
}

impl Iterator for Candidates<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            match self.doc.data(id) {
                Some(NodeData::Text(text)) => {
                    self.stats.units_visited.fetch_add(1, Ordering::Relaxed);
                    if self.registry.is_processed(id) {
                        self.stats.skipped_processed.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    if !contains_match(text) {
                        self.stats.without_match.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    self.stats.candidates.fetch_add(1, Ordering::Relaxed);
                    return Some(id);
                }
                Some(NodeData::Element(_)) => {
                    if filter::is_excluded_element(self.doc, id) {
                        self.stats.skipped_context.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    self.stack
                        .extend(self.doc.children(id).iter().rev().copied());
                }
                Some(NodeData::Document) => {
                    self.stack
                        .extend(self.doc.children(id).iter().rev().copied());
                }
                None => {}
            }
        }
        None
    }
}

/// Start a candidate walk at `root`.
#[must_use]
pub fn candidates<'a>(
    doc: &'a Document,
    root: NodeId,
    registry: &'a DedupRegistry,
    stats: &'a ScanStats,
) -> Candidates<'a> {
    Candidates {
        doc,
        registry,
        stats,
        stack: vec![root],
    }
}

/// Collect at most `profile.max_candidates` units from the document body.
///
/// Falls back to the document root when there is no body.
#[must_use]
pub fn collect_candidates(
    doc: &Document,
    registry: &DedupRegistry,
    profile: &ThroughputProfile,
) -> (Vec<NodeId>, ScanStatsSnapshot) {
    let stats = ScanStats::new();
    let root = doc.body().unwrap_or_else(|| doc.root());

    let found: Vec<NodeId> = candidates(doc, root, registry, &stats)
        .take(profile.max_candidates)
        .collect();

    let snapshot = stats.snapshot();
    tracing::debug!(
        candidates = found.len(),
        visited = snapshot.units_visited,
        skipped_processed = snapshot.skipped_processed,
        skipped_context = snapshot.skipped_context,
        limit = profile.max_candidates,
        "Collected scan candidates"
    );

    (found, snapshot)
}
