//! Click events and listeners.

use std::sync::Arc;

use super::NodeId;

/// Callback attached to a node; invoked while a click bubbles through it.
pub type Listener = Arc<dyn Fn(&mut ClickEvent) + Send + Sync>;

/// A click travelling from its target up through the ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    target: NodeId,
    current_target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl ClickEvent {
    pub(crate) const fn new(target: NodeId) -> Self {
        Self {
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Node that was clicked.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }

    /// Node whose listener is currently running.
    #[must_use]
    pub const fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub(crate) fn set_current_target(&mut self, node: NodeId) {
        self.current_target = node;
    }

    /// Suppress the host's default action.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Stop the event from reaching further ancestors.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    #[must_use]
    pub const fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    #[must_use]
    pub const fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}
