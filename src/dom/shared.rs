//! Shared, lockable document handle.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::event::ClickEvent;
use super::{Document, NodeId};

/// Document shared between the host and the engine.
///
/// Clone is cheap - it just clones the Arc. Locks are short and never held
/// across an `.await`.
#[derive(Clone, Debug)]
pub struct SharedDocument {
    inner: Arc<Mutex<Document>>,
}

impl SharedDocument {
    /// Wrap a document.
    #[must_use]
    pub fn new(doc: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(doc)),
        }
    }

    /// Run a closure with exclusive access to the document.
    pub fn with_doc<T>(&self, f: impl FnOnce(&mut Document) -> T) -> T {
        let mut doc = self.inner.lock();
        f(&mut doc)
    }

    /// Run a closure with read access to the document.
    pub fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> T {
        let doc = self.inner.lock();
        f(&doc)
    }

    /// Non-owning handle, used by listeners stored inside the document.
    #[must_use]
    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Click `target` and bubble the event through its ancestors.
    ///
    /// Listeners run without the document lock held, so they are free to
    /// lock it themselves. A target that no longer exists dispatches nothing.
    pub fn dispatch_click(&self, target: NodeId) -> ClickEvent {
        let path: Vec<_> = self.read(|doc| {
            if !doc.contains(target) {
                return Vec::new();
            }
            std::iter::once(target)
                .chain(doc.ancestors(target))
                .map(|node| (node, doc.listeners(node)))
                .filter(|(_, listeners)| !listeners.is_empty())
                .collect()
        });

        let mut event = ClickEvent::new(target);
        for (node, listeners) in path {
            event.set_current_target(node);
            for listener in listeners {
                listener(&mut event);
            }
            if event.propagation_stopped() {
                break;
            }
        }
        event
    }
}

/// Weak counterpart of [`SharedDocument`].
#[derive(Clone, Debug)]
pub struct WeakDocument {
    inner: Weak<Mutex<Document>>,
}

impl WeakDocument {
    /// Upgrade if the document is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<SharedDocument> {
        self.inner.upgrade().map(|inner| SharedDocument { inner })
    }
}
