//! Graph index, topological layering, ancestor/descendant closures, and
//! fork/join classification over a directed acyclic graph.

pub mod error;
pub mod graph;
pub mod sets;
pub mod topo;

pub use error::GraphError;
pub use graph::{Edge, GraphIndex, NodeId};
pub use sets::NodeSet;
pub use topo::{classify_forks_joins, compute_layers_and_closures, Closures, ForkJoin, Layers};
