use dagbelief_algebra::ProbTag;
use dagbelief_graph::{GraphError, NodeId};
use thiserror::Error;

/// Everything that can prevent `compute_beliefs` from returning a result.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph is structurally invalid: {0}")]
    Structural(#[from] GraphError),

    #[error("no prior supplied for node {node}")]
    MissingPrior { node: NodeId },

    #[error("no edge probability supplied for edge ({source} -> {target})")]
    MissingEdgeProb { source: NodeId, target: NodeId },

    #[error("priors and edge probabilities must share a single Prob representation, found both {a:?} and {b:?}")]
    MixedProbabilityTags { a: ProbTag, b: ProbTag },

    #[error("belief computed for node {node} drifted out of range: {value}")]
    NumericOutOfRange { node: NodeId, value: f64 },

    #[error("computation was cancelled")]
    Cancelled,
}
