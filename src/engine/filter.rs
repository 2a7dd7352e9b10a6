//! Context filtering for text units.

use crate::dom::{Document, NodeId};

/// Class carried by every wrapper the engine creates.
pub const WRAPPER_CLASS: &str = "dutch-postal-code";

/// Class carried by the copy trigger inside a wrapper.
pub const TRIGGER_CLASS: &str = "copy-postal-code";

/// Elements whose text is never annotated.
const EXCLUDED_TAGS: &[&str] = &["input", "textarea", "script", "style"];

/// Whether `id` is a wrapper element created by the engine.
#[must_use]
pub fn is_wrapper(doc: &Document, id: NodeId) -> bool {
    doc.has_class(id, WRAPPER_CLASS)
}

/// Whether the subtree rooted at element `id` must be skipped entirely.
#[must_use]
pub fn is_excluded_element(doc: &Document, id: NodeId) -> bool {
    doc.tag(id).is_some_and(|tag| EXCLUDED_TAGS.contains(&tag)) || is_wrapper(doc, id)
}

/// Whether any ancestor of `id` is a wrapper.
#[must_use]
pub fn is_inside_wrapper(doc: &Document, id: NodeId) -> bool {
    doc.ancestors(id).any(|a| is_wrapper(doc, a))
}

/// Whether `id` is a wrapper or lies inside one.
#[must_use]
pub fn is_within_wrapper(doc: &Document, id: NodeId) -> bool {
    is_wrapper(doc, id) || is_inside_wrapper(doc, id)
}

/// Whether a text unit sits in a context the engine may rewrite.
#[must_use]
pub fn is_eligible(doc: &Document, id: NodeId) -> bool {
    !doc.ancestors(id).any(|a| is_excluded_element(doc, a))
}
