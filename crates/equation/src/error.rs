//! Error types for the equation crate

use crate::node::NodeKind;
use crate::NodeId;
use thiserror::Error;

/// Errors raised by tree mutations and recomputation
#[derive(Error, Debug)]
pub enum LayoutError {
    /// A mutation index outside the row's valid bounds
    #[error("Index {index} out of range for row of length {len}")]
    OutOfRangeIndex { index: usize, len: usize },

    /// Batch arguments that cannot be applied together
    #[error("Inconsistent batch arguments: {0}")]
    InconsistentBatchArguments(String),

    /// Clone requested on a node whose row invariants are broken
    #[error("Invalid clone state: {0}")]
    InvalidCloneState(String),

    /// No node with this id lives in the tree
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The node exists but is of the wrong kind for the operation
    #[error("Node {id} is not a {expected:?}")]
    UnexpectedNodeKind { id: NodeId, expected: NodeKind },

    /// The node is still attached to an owner
    #[error("Node {0} is still attached to a parent")]
    NotDetached(NodeId),

    /// Geometry of a group wrapper can only come from its content
    #[error("Geometry of {0} is derived from its content")]
    DerivedGeometry(NodeId),

    /// Settings could not be parsed
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result type for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;
