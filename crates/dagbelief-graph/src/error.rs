use thiserror::Error;

use crate::NodeId;

/// Structural errors, fatal at index construction or at layering time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("self-loop at node {node}")]
    SelfLoop { node: NodeId },

    #[error("duplicate edge ({source}, {target})")]
    DuplicateEdge { source: NodeId, target: NodeId },

    #[error("graph is not acyclic: cycle closes at node {node}")]
    NotADAG { node: NodeId },

    #[error("unknown node {node}")]
    UnknownNode { node: NodeId },
}
