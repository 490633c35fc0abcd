use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::GraphError;

/// Opaque node identifier. Dense enough to use as an array index in the
/// common case, but the index doesn't require a contiguous range — see
/// `GraphIndex::dense_index` for the compaction used internally by bitset
/// node sets.
pub type NodeId = u64;

/// A directed edge `(source, target)`, distinct endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }
}

/// Immutable edge list plus outgoing/incoming adjacency, built once from a
/// raw edge sequence and never mutated afterward.
///
/// Node iteration order (`nodes()`, `sources()`) is always ascending by id,
/// so downstream structural passes (layering, diamond identification) are
/// reproducible regardless of the order edges were supplied in.
#[derive(Clone, Debug, Default)]
pub struct GraphIndex {
    edgelist: Vec<Edge>,
    outgoing: IndexMap<NodeId, Vec<NodeId>>,
    incoming: IndexMap<NodeId, Vec<NodeId>>,
    sources: Vec<NodeId>,
}

impl GraphIndex {
    /// Build an index from a raw edge sequence, in the order given
    /// (`edgelist` preserves this order for deterministic tie-breaking).
    ///
    /// Errors fail fast in the order: self-loop, duplicate edge, cycle.
    pub fn build(edges: impl IntoIterator<Item = Edge>) -> Result<Self, GraphError> {
        let edgelist: Vec<Edge> = edges.into_iter().collect();

        for e in &edgelist {
            if e.source == e.target {
                return Err(GraphError::SelfLoop { node: e.source });
            }
        }

        let mut seen = HashSet::with_capacity(edgelist.len());
        for e in &edgelist {
            if !seen.insert((e.source, e.target)) {
                return Err(GraphError::DuplicateEdge {
                    source: e.source,
                    target: e.target,
                });
            }
        }

        let mut node_set: HashSet<NodeId> = HashSet::new();
        for e in &edgelist {
            node_set.insert(e.source);
            node_set.insert(e.target);
        }
        let mut node_order: Vec<NodeId> = node_set.into_iter().collect();
        node_order.sort_unstable();

        let mut outgoing: IndexMap<NodeId, Vec<NodeId>> = IndexMap::with_capacity(node_order.len());
        let mut incoming: IndexMap<NodeId, Vec<NodeId>> = IndexMap::with_capacity(node_order.len());
        for &n in &node_order {
            outgoing.insert(n, Vec::new());
            incoming.insert(n, Vec::new());
        }
        for e in &edgelist {
            outgoing.get_mut(&e.source).unwrap().push(e.target);
            incoming.get_mut(&e.target).unwrap().push(e.source);
        }

        let sources: Vec<NodeId> = node_order
            .iter()
            .copied()
            .filter(|n| incoming[n].is_empty())
            .collect();

        let index = Self {
            edgelist,
            outgoing,
            incoming,
            sources,
        };
        detect_cycle(&index)?;
        Ok(index)
    }

    pub fn edgelist(&self) -> &[Edge] {
        &self.edgelist
    }

    pub fn outgoing(&self, node: NodeId) -> &[NodeId] {
        self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, node: NodeId) -> &[NodeId] {
        self.incoming.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    /// All nodes, ascending by id.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.outgoing.contains_key(&node)
    }

    /// Compact `0..node_count()` index for a node, used by bitset-backed
    /// node sets. `None` if `node` isn't in this index.
    pub fn dense_index(&self, node: NodeId) -> Option<usize> {
        self.outgoing.get_index_of(&node)
    }

    /// Inverse of `dense_index`.
    pub fn node_at(&self, dense: usize) -> NodeId {
        *self.outgoing.get_index(dense).expect("dense index in range").0
    }
}

/// Iterative DFS with explicit on-stack marking: a node is "on stack" while
/// its subtree is being explored, so an edge into an on-stack node is a back
/// edge and the graph has a cycle.
fn detect_cycle(index: &GraphIndex) -> Result<(), GraphError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let n = index.node_count();
    let mut color = vec![Color::White; n];
    // (node, next successor offset to visit)
    let mut stack: Vec<(NodeId, usize)> = Vec::new();

    for start in index.nodes() {
        let start_dense = index.dense_index(start).unwrap();
        if color[start_dense] != Color::White {
            continue;
        }
        stack.push((start, 0));
        color[start_dense] = Color::Gray;
        while let Some(&(node, offset)) = stack.last() {
            let succs = index.outgoing(node);
            if offset < succs.len() {
                let next = succs[offset];
                stack.last_mut().unwrap().1 += 1;
                let next_dense = index.dense_index(next).unwrap();
                match color[next_dense] {
                    Color::White => {
                        color[next_dense] = Color::Gray;
                        stack.push((next, 0));
                    }
                    Color::Gray => return Err(GraphError::NotADAG { node: next }),
                    Color::Black => {}
                }
            } else {
                let dense = index.dense_index(node).unwrap();
                color[dense] = Color::Black;
                stack.pop();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(u64, u64)]) -> Vec<Edge> {
        pairs.iter().map(|&(s, t)| Edge::new(s, t)).collect()
    }

    #[test]
    fn build_simple_dag() {
        let index = GraphIndex::build(edges(&[(1, 2), (1, 3), (2, 4), (3, 4)])).unwrap();
        assert_eq!(index.sources(), &[1]);
        assert_eq!(index.outgoing(1), &[2, 3]);
        assert_eq!(index.incoming(4), &[2, 3]);
        assert_eq!(index.node_count(), 4);
    }

    #[test]
    fn self_loop_rejected() {
        let err = GraphIndex::build(edges(&[(1, 1)])).unwrap_err();
        assert_eq!(err, GraphError::SelfLoop { node: 1 });
    }

    #[test]
    fn duplicate_edge_rejected() {
        let err = GraphIndex::build(edges(&[(1, 2), (1, 2)])).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateEdge {
                source: 1,
                target: 2
            }
        );
    }

    #[test]
    fn cycle_rejected() {
        let err = GraphIndex::build(edges(&[(1, 2), (2, 3), (3, 1)])).unwrap_err();
        assert!(matches!(err, GraphError::NotADAG { .. }));
    }

    #[test]
    fn nodes_are_ascending() {
        let index = GraphIndex::build(edges(&[(3, 1), (1, 2)])).unwrap();
        assert_eq!(index.nodes().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn dense_index_is_a_bijection_onto_node_count() {
        let index = GraphIndex::build(edges(&[(10, 20), (20, 30)])).unwrap();
        let mut seen: Vec<usize> = index.nodes().map(|n| index.dense_index(n).unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
        for n in index.nodes() {
            assert_eq!(index.node_at(index.dense_index(n).unwrap()), n);
        }
    }
}
