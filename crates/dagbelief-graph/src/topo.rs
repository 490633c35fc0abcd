use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::graph::{GraphIndex, NodeId};
use crate::sets::NodeSet;

/// Fork nodes (`|outgoing| > 1`) and join nodes (`|incoming| > 1`).
#[derive(Clone, Debug, Default)]
pub struct ForkJoin {
    pub forks: HashSet<NodeId>,
    pub joins: HashSet<NodeId>,
}

pub fn classify_forks_joins(index: &GraphIndex) -> ForkJoin {
    let mut forks = HashSet::new();
    let mut joins = HashSet::new();
    for node in index.nodes() {
        if index.outgoing(node).len() > 1 {
            forks.insert(node);
        }
        if index.incoming(node).len() > 1 {
            joins.insert(node);
        }
    }
    ForkJoin { forks, joins }
}

/// Disjoint level sets from a Kahn-style peel; layer `i` holds every node
/// whose longest predecessor chain has length `i`. Each layer is sorted
/// ascending by node id.
#[derive(Clone, Debug, Default)]
pub struct Layers {
    pub layers: Vec<Vec<NodeId>>,
}

impl Layers {
    pub fn layer_of(&self, node: NodeId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.contains(&node))
    }
}

/// Ancestor (`transitive predecessors ∪ {v}`) and descendant (`transitive
/// successors`) closures for every node.
#[derive(Clone, Debug, Default)]
pub struct Closures {
    ancestors: HashMap<NodeId, NodeSet>,
    descendants: HashMap<NodeId, NodeSet>,
}

impl Closures {
    pub fn ancestors(&self, node: NodeId) -> Option<&NodeSet> {
        self.ancestors.get(&node)
    }

    pub fn descendants(&self, node: NodeId) -> Option<&NodeSet> {
        self.descendants.get(&node)
    }
}

/// Kahn's algorithm, peeling one full layer at a time, building ancestor
/// closures forward (union of predecessors' ancestor sets) and descendant
/// closures by back-propagation: once `v`'s ancestor set is known, `v` is
/// added to the descendant set of every one of its ancestors. This gives the
/// `O((V+E)·avg(|ancestors|))` complexity target in a single pass.
pub fn compute_layers_and_closures(index: &GraphIndex) -> Result<(Layers, Closures), GraphError> {
    let n = index.node_count();
    let mut remaining_indegree: HashMap<NodeId, usize> = index
        .nodes()
        .map(|node| (node, index.incoming(node).len()))
        .collect();

    let mut layers: Vec<Vec<NodeId>> = Vec::new();
    let mut ancestors: HashMap<NodeId, NodeSet> = HashMap::with_capacity(n);
    let mut descendants: HashMap<NodeId, NodeSet> = index
        .nodes()
        .map(|node| (node, NodeSet::empty(index)))
        .collect();

    let mut frontier: Vec<NodeId> = index
        .sources()
        .iter()
        .copied()
        .collect::<Vec<_>>();
    frontier.sort_unstable();

    let mut processed = 0usize;
    while !frontier.is_empty() {
        for &v in &frontier {
            let mut anc = NodeSet::empty(index);
            anc.insert(index, v);
            for &u in index.incoming(v) {
                if let Some(u_anc) = ancestors.get(&u) {
                    anc.union_with(index, u_anc);
                }
            }
            for a in anc.sorted_vec(index) {
                if a != v {
                    descendants.get_mut(&a).unwrap().insert(index, v);
                }
            }
            ancestors.insert(v, anc);
        }
        layers.push(frontier.clone());
        processed += frontier.len();

        let mut next: Vec<NodeId> = Vec::new();
        for &v in &frontier {
            for &w in index.outgoing(v) {
                let deg = remaining_indegree.get_mut(&w).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    next.push(w);
                }
            }
        }
        next.sort_unstable();
        next.dedup();
        frontier = next;
    }

    if processed != n {
        let stuck = index
            .nodes()
            .find(|node| remaining_indegree[node] > 0)
            .expect("processed < n implies some node never reached zero in-degree");
        return Err(GraphError::NotADAG { node: stuck });
    }

    Ok((
        Layers { layers },
        Closures {
            ancestors,
            descendants,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn index(pairs: &[(u64, u64)]) -> GraphIndex {
        GraphIndex::build(pairs.iter().map(|&(s, t)| Edge::new(s, t))).unwrap()
    }

    #[test]
    fn layering_soundness_on_diamond() {
        let idx = index(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let (layers, _) = compute_layers_and_closures(&idx).unwrap();
        assert_eq!(layers.layers[0], vec![1]);
        assert_eq!(layers.layers[1], vec![2, 3]);
        assert_eq!(layers.layers[2], vec![4]);
    }

    #[test]
    fn closure_consistency_on_diamond() {
        let idx = index(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let (_, closures) = compute_layers_and_closures(&idx).unwrap();
        let anc4 = closures.ancestors(4).unwrap().sorted_vec(&idx);
        assert_eq!(anc4, vec![1, 2, 3, 4]);
        let desc1 = closures.descendants(1).unwrap().sorted_vec(&idx);
        assert_eq!(desc1, vec![2, 3, 4]);
        for u in idx.nodes() {
            for v in idx.nodes() {
                let u_anc_v = closures.ancestors(v).unwrap().contains(&idx, u);
                let v_desc_u = closures.descendants(u).unwrap().contains(&idx, v);
                assert_eq!(u_anc_v, v_desc_u, "u={u} v={v}");
            }
        }
    }

    #[test]
    fn fork_join_classification() {
        let idx = index(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let fj = classify_forks_joins(&idx);
        assert_eq!(fj.forks, HashSet::from([1]));
        assert_eq!(fj.joins, HashSet::from([4]));
    }

    #[test]
    fn single_parent_chain_layers_linearly() {
        let idx = index(&[(1, 2), (2, 3), (3, 4)]);
        let (layers, _) = compute_layers_and_closures(&idx).unwrap();
        assert_eq!(layers.layers.len(), 4);
        for (i, layer) in layers.layers.iter().enumerate() {
            assert_eq!(layer, &vec![i as u64 + 1]);
        }
    }
}
