//! Copy triggers.
//!
//! Every trigger gets one click listener. A click copies the wrapper's
//! `data-code` to the clipboard and briefly swaps the trigger label for a
//! check mark.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use super::annotator::CODE_ATTR;
use super::filter::TRIGGER_CLASS;
use crate::clipboard::Clipboard;
use crate::dom::{ClickEvent, Document, Listener, NodeId, SharedDocument, WeakDocument};
use crate::metrics::COPY_RESULTS;
use crate::observability::spans;

/// Marker attribute set on triggers that already have a listener.
pub const LISTENER_ATTR: &str = "data-listener";

/// Class present on a trigger while feedback is showing.
pub const COPIED_CLASS: &str = "copied";

/// Trigger label while feedback is showing.
pub const SUCCESS_GLYPH: &str = "✓";

/// Result of one copy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(String),
    Failed,
    MissingCode,
}

impl CopyOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Copied(_) => "success",
            Self::Failed => "failure",
            Self::MissingCode => "missing_code",
        }
    }
}

/// Wires triggers and performs copies.
#[derive(Clone)]
pub struct CopyHandler {
    clipboard: Arc<dyn Clipboard>,
    feedback_duration: Duration,
    debug: bool,
}

impl std::fmt::Debug for CopyHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyHandler")
            .field("feedback_duration", &self.feedback_duration)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl CopyHandler {
    #[must_use]
    pub fn new(clipboard: Arc<dyn Clipboard>, feedback_duration: Duration, debug: bool) -> Self {
        Self {
            clipboard,
            feedback_duration,
            debug,
        }
    }

    /// Attach a click listener to every trigger without the marker.
    ///
    /// `weak` must refer to the shared document that owns `doc`. Returns the
    /// number of triggers wired.
    pub fn wire_triggers(&self, doc: &mut Document, weak: &WeakDocument) -> usize {
        let scope = doc.body().unwrap_or_else(|| doc.root());
        let mut wired = 0;

        for trigger in doc.elements_with_class(scope, TRIGGER_CLASS) {
            if doc.tag(trigger) != Some("button") || doc.attribute(trigger, LISTENER_ATTR).is_some() {
                continue;
            }
            let listener = self.listener(weak.clone(), trigger);
            if doc.add_listener(trigger, listener).is_err()
                || doc.set_attribute(trigger, LISTENER_ATTR, "true").is_err()
            {
                continue;
            }
            wired += 1;
        }

        if wired > 0 {
            tracing::debug!(wired, "Wired copy triggers");
        }
        wired
    }

    fn listener(&self, weak: WeakDocument, trigger: NodeId) -> Listener {
        let handler = self.clone();
        Arc::new(move |event: &mut ClickEvent| {
            event.prevent_default();
            event.stop_propagation();

            let Some(doc) = weak.upgrade() else {
                return;
            };
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                tracing::debug!(trigger = %trigger, "No runtime available for copy");
                return;
            };
            let handler = handler.clone();
            runtime.spawn(async move {
                handler.copy(&doc, trigger).await;
            });
        })
    }

    /// Copy the code of the wrapper around `trigger` and show feedback.
    ///
    /// Returns once the feedback has been reverted.
    pub async fn copy(&self, doc: &SharedDocument, trigger: NodeId) -> CopyOutcome {
        let code = doc.read(|d| {
            d.parent(trigger)
                .and_then(|wrapper| d.attribute(wrapper, CODE_ATTR))
                .map(str::to_string)
        });
        let Some(code) = code else {
            tracing::debug!(trigger = %trigger, "Trigger has no wrapper code");
            COPY_RESULTS
                .with_label_values(&[CopyOutcome::MissingCode.label()])
                .inc();
            return CopyOutcome::MissingCode;
        };

        let span = spans::copy_span(&code);
        let outcome = async {
            match self.clipboard.write_text(code.clone()).await {
                Ok(()) => {
                    tracing::debug!("Copied postal code");
                    self.show_feedback(doc, trigger).await;
                    CopyOutcome::Copied(code)
                }
                Err(e) => {
                    if self.debug {
                        tracing::warn!(error = %e, "Failed to copy postal code");
                    } else {
                        tracing::debug!(error = %e, "Failed to copy postal code");
                    }
                    CopyOutcome::Failed
                }
            }
        }
        .instrument(span)
        .await;

        COPY_RESULTS.with_label_values(&[outcome.label()]).inc();
        outcome
    }

    async fn show_feedback(&self, doc: &SharedDocument, trigger: NodeId) {
        // A second click during feedback leaves the pending revert in charge.
        let original = doc.with_doc(|d| {
            if !d.contains(trigger) || d.has_class(trigger, COPIED_CLASS) {
                return None;
            }
            let label = d.text_content(trigger);
            d.set_text_content(trigger, SUCCESS_GLYPH).ok()?;
            d.add_class(trigger, COPIED_CLASS).ok()?;
            Some(label)
        });
        let Some(label) = original else {
            return;
        };

        tokio::time::sleep(self.feedback_duration).await;

        doc.with_doc(|d| {
            if !d.contains(trigger) {
                return;
            }
            let _ = d.set_text_content(trigger, &label);
            let _ = d.remove_class(trigger, COPIED_CLASS);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::engine::annotator::{annotate_unit, trigger_of, AnnotateOutcome, TRIGGER_GLYPH};
    use crate::engine::registry::DedupRegistry;

    const FEEDBACK: Duration = Duration::from_millis(1500);

    fn annotated_doc(text: &str) -> (SharedDocument, Vec<NodeId>) {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let p = doc.create_element("p");
        let t = doc.create_text(text);
        doc.append_child(p, t).unwrap();
        doc.append_child(body, p).unwrap();
        let mut registry = DedupRegistry::new();
        let AnnotateOutcome::Annotated { wrappers } =
            annotate_unit(&mut doc, &mut registry, t).unwrap()
        else {
            panic!("expected annotation");
        };
        let triggers = wrappers
            .iter()
            .map(|&w| trigger_of(&doc, w).unwrap())
            .collect();
        (SharedDocument::new(doc), triggers)
    }

    #[test]
    fn test_wiring_is_idempotent() {
        let (shared, triggers) = annotated_doc("1011 AB and 3511 CD");
        let handler = CopyHandler::new(Arc::new(MemoryClipboard::new()), FEEDBACK, false);
        let weak = shared.downgrade();

        assert_eq!(shared.with_doc(|d| handler.wire_triggers(d, &weak)), 2);
        assert_eq!(shared.with_doc(|d| handler.wire_triggers(d, &weak)), 0);
        shared.read(|d| {
            for &trigger in &triggers {
                assert_eq!(d.attribute(trigger, LISTENER_ATTR), Some("true"));
                assert_eq!(d.listener_count(trigger), 1);
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_copies_and_reverts_feedback() {
        let (shared, triggers) = annotated_doc("Address: 1234 AB City");
        let clipboard = MemoryClipboard::new();
        let handler = CopyHandler::new(Arc::new(clipboard.clone()), FEEDBACK, false);
        let weak = shared.downgrade();
        shared.with_doc(|d| handler.wire_triggers(d, &weak));
        let trigger = triggers[0];

        let event = shared.dispatch_click(trigger);
        assert!(event.default_prevented());
        assert!(event.propagation_stopped());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(clipboard.contents().as_deref(), Some("1234 AB"));
        shared.read(|d| {
            assert_eq!(d.text_content(trigger), SUCCESS_GLYPH);
            assert!(d.has_class(trigger, COPIED_CLASS));
        });

        tokio::time::sleep(FEEDBACK).await;
        shared.read(|d| {
            assert_eq!(d.text_content(trigger), TRIGGER_GLYPH);
            assert!(!d.has_class(trigger, COPIED_CLASS));
            assert!(d.has_class(trigger, TRIGGER_CLASS));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_copy_shows_nothing() {
        let (shared, triggers) = annotated_doc("1234 AB");
        let handler = CopyHandler::new(Arc::new(MemoryClipboard::failing()), FEEDBACK, true);

        let outcome = handler.copy(&shared, triggers[0]).await;
        assert_eq!(outcome, CopyOutcome::Failed);
        shared.read(|d| {
            assert_eq!(d.text_content(triggers[0]), TRIGGER_GLYPH);
            assert!(!d.has_class(triggers[0], COPIED_CLASS));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_without_wrapper_code() {
        let shared = SharedDocument::new(Document::with_body());
        let button = shared.with_doc(|d| {
            let body = d.body().unwrap();
            let button = d.create_element("button");
            d.append_child(body, button).unwrap();
            button
        });
        let clipboard = MemoryClipboard::new();
        let handler = CopyHandler::new(Arc::new(clipboard.clone()), FEEDBACK, false);

        assert_eq!(handler.copy(&shared, button).await, CopyOutcome::MissingCode);
        assert_eq!(clipboard.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_returns_code() {
        let (shared, triggers) = annotated_doc("9999 ZZ");
        let handler = CopyHandler::new(Arc::new(MemoryClipboard::new()), FEEDBACK, false);
        assert_eq!(
            handler.copy(&shared, triggers[0]).await,
            CopyOutcome::Copied("9999 ZZ".to_string())
        );
    }
}
