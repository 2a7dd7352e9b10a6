//! Error types and Result aliases for postcode-marker.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

use crate::dom::NodeId;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for postcode-marker operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Settings store error.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Document tree error.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Clipboard error.
    #[error("clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Settings store errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The backing store could not be reached.
    #[error("settings store unavailable: {0}")]
    Unavailable(String),

    /// Stored settings could not be decoded.
    #[error("malformed settings: {0}")]
    Malformed(String),

    /// Settings could not be written.
    #[error("failed to persist settings to '{path}': {reason}")]
    Persist { path: String, reason: String },
}

/// Document tree errors.
///
/// Most of these describe a handle that outlived its node, which the engine
/// treats as a per-item no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The node was reclaimed.
    #[error("node {0} no longer exists")]
    Gone(NodeId),

    /// The node has no parent.
    #[error("node {0} is detached")]
    Detached(NodeId),

    /// `child` is not a child of `parent`.
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Operation requires an element node.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Operation requires a text node.
    #[error("node {0} is not a text node")]
    NotText(NodeId),

    /// Insertion would create a cycle or move the document root.
    #[error("cannot insert {child} into {parent}: {reason}")]
    Hierarchy {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },
}

/// Clipboard errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// The write was rejected by the backend.
    #[error("clipboard write failed: {0}")]
    WriteFailed(String),

    /// No clipboard backend is reachable.
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl SettingsError {
    /// Create a persistence error for a path.
    pub fn persist(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Persist {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
