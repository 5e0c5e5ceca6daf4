//! Error taxonomy shared by the document tree, drag engine, and session.
//!
//! Nothing here is fatal: every variant describes an operation that was
//! rejected while leaving prior state intact.

use crate::tree::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    /// An operation referenced a node or zone id that is not present.
    #[error("unknown node or zone: {0}")]
    NotFound(NodeId),
    /// The operation is structurally illegal (root removal, cycles, duplicate ids).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// A snapshot handed to `load` is internally inconsistent.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    /// A pointer-down arrived while another gesture owns the engine.
    #[error("a drag gesture is already in progress")]
    GestureConflict,
    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
