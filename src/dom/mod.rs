//! In-process document model.
//!
//! This module provides:
//! - An arena-backed tree with generational node handles
//! - Mutation records for observers of connected nodes
//! - Bubbling click dispatch to node listeners
//! - HTML serialization

mod document;
mod event;
mod mutation;
mod node;
mod serialize;
mod shared;

pub use document::{Ancestors, Descendants, Document};
pub use event::{ClickEvent, Listener};
pub use mutation::{MutationKind, MutationRecord, ObserverOptions};
pub use node::{Element, NodeData, NodeId};
pub use serialize::{inner_html, outer_html};
pub use shared::{SharedDocument, WeakDocument};
