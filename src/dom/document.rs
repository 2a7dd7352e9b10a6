//! Arena-backed document tree.
//!
//! Nodes live in slots addressed by generational [`NodeId`]s. Detaching a
//! node keeps its slot; only [`Document::collect_garbage`] reclaims slots that
//! are no longer reachable from the root, after which old handles go inert.
//!
//! Structural changes on connected nodes are reported to observers as
//! [`MutationRecord`]s over unbounded channels, mirroring how a browser queues
//! records for delivery after the mutating script step finishes.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::mpsc;

use super::event::Listener;
use super::mutation::{MutationRecord, ObserverOptions};
use super::node::{Element, NodeData, NodeId};
use crate::error::DocumentError;

type DocResult<T> = std::result::Result<T, DocumentError>;

#[derive(Debug)]
struct Entry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

struct Observer {
    options: ObserverOptions,
    tx: mpsc::UnboundedSender<MutationRecord>,
}

/// A mutable document tree.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    observers: Vec<Observer>,
    listeners: HashMap<NodeId, Vec<Listener>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("live_nodes", &self.live_nodes())
            .field("observers", &self.observers.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(0, 0),
            observers: Vec::new(),
            listeners: HashMap::new(),
        };
        doc.root = doc.alloc(NodeData::Document);
        doc
    }

    /// Create a document with an `html` element holding `head` and `body`.
    #[must_use]
    pub fn with_body() -> Self {
        let mut doc = Self::new();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        let root = doc.root;
        // Freshly created nodes cannot fail these checks.
        let _ = doc.append_child(root, html);
        let _ = doc.append_child(html, head);
        let _ = doc.append_child(html, body);
        doc
    }

    /// The document root.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// First `body` element in tree order, if any.
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&id| self.tag(id) == Some("body"))
    }

    /// Number of nodes currently holding a slot.
    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn alloc(&mut self, data: NodeData) -> NodeId {
        let entry = Entry {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            NodeId::new(index, 0)
        }
    }

    fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entry.as_mut())
    }

    fn require(&self, id: NodeId) -> DocResult<&Entry> {
        self.entry(id).ok_or(DocumentError::Gone(id))
    }

    fn require_mut(&mut self, id: NodeId) -> DocResult<&mut Entry> {
        self.entry_mut(id).ok_or(DocumentError::Gone(id))
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(Element::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    /// Whether the handle still refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    /// Node payload.
    #[must_use]
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.entry(id).map(|e| &e.data)
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).and_then(|e| e.parent)
    }

    /// Children of a node; empty for reclaimed handles.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id).map_or(&[], |e| e.children.as_slice())
    }

    /// Element payload of a node.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.data(id).and_then(NodeData::as_element)
    }

    /// Text of a text node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.data(id).and_then(NodeData::as_text)
    }

    /// Tag of an element node.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::tag)
    }

    /// Attribute of an element node.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attribute(name))
    }

    /// Whether an element node carries `class`.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    /// Set an attribute on an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is gone or not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DocResult<()> {
        match &mut self.require_mut(id)?.data {
            NodeData::Element(el) => {
                el.set_attribute(name, value);
            }
            _ => return Err(DocumentError::NotAnElement(id)),
        }
        self.notify(MutationRecord::attributes(id, name));
        Ok(())
    }

    /// Remove an attribute from an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is gone or not an element.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DocResult<()> {
        let removed = match &mut self.require_mut(id)?.data {
            NodeData::Element(el) => el.remove_attribute(name).is_some(),
            _ => return Err(DocumentError::NotAnElement(id)),
        };
        if removed {
            self.notify(MutationRecord::attributes(id, name));
        }
        Ok(())
    }

    /// Add a class to an element; no-op if already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is gone or not an element.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> DocResult<()> {
        let el = self.element(id).ok_or_else(|| self.not_element(id))?;
        if el.has_class(class) {
            return Ok(());
        }
        let value = el
            .classes()
            .chain(std::iter::once(class))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "class", &value)
    }

    /// Remove a class from an element; no-op if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is gone or not an element.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> DocResult<()> {
        let el = self.element(id).ok_or_else(|| self.not_element(id))?;
        if !el.has_class(class) {
            return Ok(());
        }
        let value = el
            .classes()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "class", &value)
    }

    fn not_element(&self, id: NodeId) -> DocumentError {
        if self.contains(id) {
            DocumentError::NotAnElement(id)
        } else {
            DocumentError::Gone(id)
        }
    }

    /// Replace the character data of a text node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is gone or not a text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> DocResult<()> {
        match &mut self.require_mut(id)?.data {
            NodeData::Text(current) => *current = text.into(),
            _ => return Err(DocumentError::NotText(id)),
        }
        self.notify(MutationRecord::character_data(id));
        Ok(())
    }

    /// Concatenated text of a node and its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|d| self.text(d))
            .collect()
    }

    /// Replace all children of an element with a single text node.
    ///
    /// Text nodes get their data replaced instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is gone.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DocResult<()> {
        if self.require(id)?.data.as_text().is_some() {
            return self.set_text(id, text);
        }
        if self.require(id)?.data == NodeData::Document {
            return Err(DocumentError::NotAnElement(id));
        }

        let removed = std::mem::take(&mut self.require_mut(id)?.children);
        for child in &removed {
            if let Some(entry) = self.entry_mut(*child) {
                entry.parent = None;
            }
        }

        let mut added = Vec::new();
        if !text.is_empty() {
            let node = self.create_text(text);
            self.link(id, node, None)?;
            added.push(node);
        }

        self.notify(MutationRecord::child_list(id, added, removed));
        Ok(())
    }

    /// Ancestors of a node, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Descendants of a node in tree order, excluding the node itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Whether the node is reachable from the root.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Elements under `scope` carrying `class`, in tree order.
    #[must_use]
    pub fn elements_with_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&id| self.has_class(id, class))
            .collect()
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> DocResult<()> {
        if !self.require(parent)?.data.is_container() {
            return Err(DocumentError::NotAnElement(parent));
        }
        self.require(child)?;
        if child == self.root {
            return Err(DocumentError::Hierarchy {
                parent,
                child,
                reason: "the root cannot be moved",
            });
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(DocumentError::Hierarchy {
                parent,
                child,
                reason: "a node cannot contain its own ancestor",
            });
        }
        Ok(())
    }

    /// Detach `child` from its current parent, if any, and report it.
    fn unlink(&mut self, child: NodeId) {
        let Some(old_parent) = self.parent(child) else {
            return;
        };
        if let Some(entry) = self.entry_mut(old_parent) {
            entry.children.retain(|c| *c != child);
        }
        if let Some(entry) = self.entry_mut(child) {
            entry.parent = None;
        }
        self.notify(MutationRecord::child_list(old_parent, vec![], vec![child]));
    }

    /// Attach a parentless `child` under `parent` before `reference`.
    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DocResult<()> {
        let position = match reference {
            Some(r) => self
                .children(parent)
                .iter()
                .position(|c| *c == r)
                .ok_or(DocumentError::NotAChild { parent, child: r })?,
            None => self.children(parent).len(),
        };
        self.require_mut(parent)?.children.insert(position, child);
        self.require_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is gone or the insertion would break
    /// the tree.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DocResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (or last if `None`).
    ///
    /// # Errors
    ///
    /// Returns an error if a node is gone, `reference` is not a child of
    /// `parent`, or the insertion would break the tree.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DocResult<()> {
        self.check_insert(parent, child)?;
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DocumentError::NotAChild { parent, child: r });
            }
            if r == child {
                return Ok(());
            }
        }
        self.unlink(child);
        self.link(parent, child, reference)?;
        self.notify(MutationRecord::child_list(parent, vec![child], vec![]));
        Ok(())
    }

    /// Detach `child` from `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if a node is gone or `child` is not a child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DocResult<()> {
        self.require(parent)?;
        self.require(child)?;
        if self.parent(child) != Some(parent) {
            return Err(DocumentError::NotAChild { parent, child });
        }
        self.unlink(child);
        Ok(())
    }

    /// Replace `node` by `replacements` in one step.
    ///
    /// Observers see a single child-list record on the parent listing every
    /// replacement as added and `node` as removed.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is gone or detached, or a replacement
    /// cannot be inserted.
    pub fn replace_with_nodes(&mut self, node: NodeId, replacements: &[NodeId]) -> DocResult<()> {
        self.require(node)?;
        let parent = self.parent(node).ok_or(DocumentError::Detached(node))?;
        for &r in replacements {
            if r == node {
                return Err(DocumentError::Hierarchy {
                    parent,
                    child: r,
                    reason: "a node cannot replace itself",
                });
            }
            self.check_insert(parent, r)?;
        }

        for &r in replacements {
            self.unlink(r);
        }
        let position = self
            .children(parent)
            .iter()
            .position(|c| *c == node)
            .ok_or(DocumentError::NotAChild { parent, child: node })?;
        let children = &mut self.require_mut(parent)?.children;
        let tail = children.split_off(position + 1);
        children.pop();
        children.extend_from_slice(replacements);
        children.extend(tail);
        for &r in replacements {
            self.require_mut(r)?.parent = Some(parent);
        }
        self.require_mut(node)?.parent = None;

        self.notify(MutationRecord::child_list(
            parent,
            replacements.to_vec(),
            vec![node],
        ));
        Ok(())
    }

    /// Reclaim every node that is not reachable from the root.
    ///
    /// Handles to reclaimed nodes go inert. Detached nodes a caller is still
    /// assembling are reclaimed too, so only call this between operations.
    ///
    /// Returns the number of reclaimed nodes.
    pub fn collect_garbage(&mut self) -> usize {
        let mut reachable: HashSet<NodeId> = self.descendants(self.root).collect();
        reachable.insert(self.root);

        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.is_none() {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let id = NodeId::new(index as u32, slot.generation);
            if reachable.contains(&id) {
                continue;
            }
            slot.entry = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index as u32);
            self.listeners.remove(&id);
            freed += 1;
        }

        if freed > 0 {
            tracing::trace!(freed, "Reclaimed detached nodes");
        }
        freed
    }

    /// Start observing the document.
    ///
    /// Records are only produced for changes whose target is connected.
    pub fn observe(&mut self, options: ObserverOptions) -> mpsc::UnboundedReceiver<MutationRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(Observer { options, tx });
        rx
    }

    fn notify(&mut self, record: MutationRecord) {
        if self.observers.is_empty() || !self.is_connected(record.target) {
            return;
        }
        self.observers.retain(|observer| {
            if !observer.options.wants(record.kind) {
                return !observer.tx.is_closed();
            }
            observer.tx.send(record.clone()).is_ok()
        });
    }

    /// Attach a click listener to a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is gone.
    pub fn add_listener(&mut self, id: NodeId, listener: Listener) -> DocResult<()> {
        self.require(id)?;
        self.listeners.entry(id).or_default().push(listener);
        Ok(())
    }

    /// Listeners attached to a node.
    #[must_use]
    pub fn listeners(&self, id: NodeId) -> Vec<Listener> {
        self.listeners.get(&id).cloned().unwrap_or_default()
    }

    /// Number of listeners attached to a node.
    #[must_use]
    pub fn listener_count(&self, id: NodeId) -> usize {
        self.listeners.get(&id).map_or(0, Vec::len)
    }
}

/// Iterator over a node's ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over a node's descendants.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
