//! In-place annotation of text units.
//!
//! A unit holding postal codes is replaced by a fragment of plain text nodes
//! and wrapper elements:
//!
//! ```text
//! <span class="dutch-postal-code" data-code="1234 AB">1234 AB<button
//!     class="copy-postal-code" title="Copy postal code">📋</button></span>
//! ```
//!
//! Matches are applied from the last to the first so that each split leaves
//! the offsets of the matches still to be processed untouched.

use super::filter::{self, TRIGGER_CLASS, WRAPPER_CLASS};
use super::matcher::{find_matches, Match};
use super::registry::{AnnotationKey, DedupRegistry};
use crate::dom::{Document, NodeId};
use crate::error::DocumentError;

/// Attribute on the wrapper holding the matched code.
pub const CODE_ATTR: &str = "data-code";

/// Initial label of the copy trigger.
pub const TRIGGER_GLYPH: &str = "📋";

/// Tooltip of the copy trigger.
pub const TRIGGER_TITLE: &str = "Copy postal code";

/// Why a unit was left alone without being marked processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyProcessed,
    Gone,
    Detached,
    NotText,
    Excluded,
}

/// Result of annotating one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotateOutcome {
    /// Nothing was read or written.
    Skipped(SkipReason),
    /// The unit holds no postal code; it is now marked processed.
    NoMatches,
    /// Every match was already wrapped; the unit is now marked processed.
    Unchanged,
    /// The unit was replaced; these wrappers were inserted.
    Annotated { wrappers: Vec<NodeId> },
}

enum Piece<'t> {
    Text(&'t str),
    Code(&'t str),
}

/// Annotate every postal code in `unit`.
///
/// # Errors
///
/// Returns an error if the document rejects the rewrite. Vanished and
/// detached units are reported as [`AnnotateOutcome::Skipped`] instead.
pub fn annotate_unit(
    doc: &mut Document,
    registry: &mut DedupRegistry,
    unit: NodeId,
) -> Result<AnnotateOutcome, DocumentError> {
    if registry.is_processed(unit) {
        return Ok(AnnotateOutcome::Skipped(SkipReason::AlreadyProcessed));
    }
    if !doc.contains(unit) {
        return Ok(AnnotateOutcome::Skipped(SkipReason::Gone));
    }
    if doc.parent(unit).is_none() {
        return Ok(AnnotateOutcome::Skipped(SkipReason::Detached));
    }
    let Some(text) = doc.text(unit).map(str::to_owned) else {
        return Ok(AnnotateOutcome::Skipped(SkipReason::NotText));
    };
    if !filter::is_eligible(doc, unit) {
        return Ok(AnnotateOutcome::Skipped(SkipReason::Excluded));
    }

    let matches = find_matches(&text);
    if matches.is_empty() {
        registry.mark_processed(unit);
        return Ok(AnnotateOutcome::NoMatches);
    }

    let pieces = plan_fragment(unit, &text, &matches, registry);
    if !pieces.iter().any(|p| matches!(p, Piece::Code(_))) {
        registry.mark_processed(unit);
        return Ok(AnnotateOutcome::Unchanged);
    }

    let mut fragment = Vec::with_capacity(pieces.len());
    let mut wrappers = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Text(segment) => fragment.push(doc.create_text(segment)),
            Piece::Code(code) => {
                let wrapper = build_wrapper(doc, code)?;
                wrappers.push(wrapper);
                fragment.push(wrapper);
            }
        }
    }

    doc.replace_with_nodes(unit, &fragment)?;
    registry.mark_processed(unit);

    tracing::trace!(unit = %unit, wrappers = wrappers.len(), "Annotated text unit");
    Ok(AnnotateOutcome::Annotated { wrappers })
}

/// Split `text` into plain and code pieces, walking matches right to left.
///
/// Matches whose key is already recorded stay inside the surrounding plain
/// text.
fn plan_fragment<'t>(
    unit: NodeId,
    text: &'t str,
    matches: &[Match],
    registry: &mut DedupRegistry,
) -> Vec<Piece<'t>> {
    let mut pieces = Vec::with_capacity(matches.len() * 2 + 1);
    let mut end = text.len();

    for m in matches.iter().rev() {
        let key = AnnotationKey::new(unit, text, m.offset, &m.text);
        if !registry.record_annotation(key) {
            tracing::trace!(unit = %unit, offset = m.offset, "Match already annotated");
            continue;
        }
        if m.end() < end {
            pieces.push(Piece::Text(&text[m.end()..end]));
        }
        pieces.push(Piece::Code(&text[m.offset..m.end()]));
        end = m.offset;
    }
    if end > 0 {
        pieces.push(Piece::Text(&text[..end]));
    }

    pieces.reverse();
    pieces
}

fn build_wrapper(doc: &mut Document, code: &str) -> Result<NodeId, DocumentError> {
    let wrapper = doc.create_element("span");
    doc.set_attribute(wrapper, "class", WRAPPER_CLASS)?;
    doc.set_attribute(wrapper, CODE_ATTR, code)?;
    let label = doc.create_text(code);
    doc.append_child(wrapper, label)?;

    let trigger = doc.create_element("button");
    doc.set_attribute(trigger, "class", TRIGGER_CLASS)?;
    doc.set_attribute(trigger, "title", TRIGGER_TITLE)?;
    let glyph = doc.create_text(TRIGGER_GLYPH);
    doc.append_child(trigger, glyph)?;
    doc.append_child(wrapper, trigger)?;

    Ok(wrapper)
}

/// The copy trigger inside a wrapper.
#[must_use]
pub fn trigger_of(doc: &Document, wrapper: NodeId) -> Option<NodeId> {
    doc.children(wrapper)
        .iter()
        .copied()
        .find(|&c| doc.has_class(c, TRIGGER_CLASS))
}
