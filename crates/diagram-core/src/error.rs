//! Errors raised by the graph model.

use crate::id::{EdgeId, NodeId};
use thiserror::Error;

/// A mutation the model refused to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("edge {0} already exists")]
    DuplicateEdge(EdgeId),

    #[error("parent node {0} not found")]
    ParentNotFound(NodeId),

    #[error("the root node cannot be removed")]
    RootRemoval,
}
