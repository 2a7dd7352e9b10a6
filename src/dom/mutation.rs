//! Mutation records delivered to document observers.

#![allow(clippy::missing_const_for_fn)]

use super::NodeId;

/// Kind of structural or content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added to or removed from `target`.
    ChildList,
    /// The text of `target` changed.
    CharacterData,
    /// An attribute of `target` changed.
    Attributes,
}

/// One observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
}

impl MutationRecord {
    /// Child-list change on `target`.
    #[must_use]
    pub fn child_list(target: NodeId, added_nodes: Vec<NodeId>, removed_nodes: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
            attribute_name: None,
        }
    }

    /// Text change on `target`.
    #[must_use]
    pub fn character_data(target: NodeId) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: None,
        }
    }

    /// Attribute change on `target`.
    #[must_use]
    pub fn attributes(target: NodeId, name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
        }
    }

    /// Whether this record adds at least one node.
    #[must_use]
    pub fn has_additions(&self) -> bool {
        self.kind == MutationKind::ChildList && !self.added_nodes.is_empty()
    }
}

/// Which record kinds an observer wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverOptions {
    pub child_list: bool,
    pub character_data: bool,
    pub attributes: bool,
}

impl ObserverOptions {
    /// Structural changes only.
    #[must_use]
    pub const fn child_list() -> Self {
        Self {
            child_list: true,
            character_data: false,
            attributes: false,
        }
    }

    /// Every record kind.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            child_list: true,
            character_data: true,
            attributes: true,
        }
    }

    /// Whether a record of `kind` should be delivered.
    #[must_use]
    pub const fn wants(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::CharacterData => self.character_data,
            MutationKind::Attributes => self.attributes,
        }
    }
}
