//! Small graph-literal helpers so a test can write `chain(5)` or
//! `diamond(1, 2, 3, 4)` instead of spelling out an edge list by hand, and
//! `scalars`/`edge_scalars` to build the plain-`f64` maps the oracles take.

use std::collections::HashMap;

use dagbelief_algebra::Prob;
use dagbelief_graph::{Edge, NodeId};

/// A straight-line chain `1 -> 2 -> ... -> n`.
pub fn chain(n: NodeId) -> Vec<Edge> {
    (1..n).map(|i| Edge::new(i, i + 1)).collect()
}

/// The canonical single diamond: `source` forks to `mid_a`/`mid_b`, both of
/// which rejoin at `join`.
pub fn diamond(source: NodeId, mid_a: NodeId, mid_b: NodeId, join: NodeId) -> Vec<Edge> {
    vec![
        Edge::new(source, mid_a),
        Edge::new(source, mid_b),
        Edge::new(mid_a, join),
        Edge::new(mid_b, join),
    ]
}

/// A join fed by `n` independent forks through two shared mid-layer nodes
/// `mid_a`/`mid_b`, i.e. a diamond with `n` highest nodes instead of 1.
pub fn wide_diamond(forks: &[NodeId], mid_a: NodeId, mid_b: NodeId, join: NodeId) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(forks.len() * 2 + 2);
    for &f in forks {
        edges.push(Edge::new(f, mid_a));
        edges.push(Edge::new(f, mid_b));
    }
    edges.push(Edge::new(mid_a, join));
    edges.push(Edge::new(mid_b, join));
    edges
}

pub fn scalars(pairs: &[(NodeId, f64)]) -> HashMap<NodeId, f64> {
    pairs.iter().copied().collect()
}

pub fn edge_scalars(pairs: &[((NodeId, NodeId), f64)]) -> HashMap<(NodeId, NodeId), f64> {
    pairs.iter().copied().collect()
}

/// Widen a plain-`f64` prior/edge-probability map into the `Prob::Scalar`
/// map `compute_beliefs` expects, so a test can share one set of numbers
/// between an oracle call and an engine call.
pub fn as_prob_map<K: Eq + std::hash::Hash + Copy>(pairs: &HashMap<K, f64>) -> HashMap<K, Prob> {
    pairs.iter().map(|(&k, &v)| (k, Prob::Scalar(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_builds_sequential_edges() {
        let edges = chain(4);
        assert_eq!(edges, vec![Edge::new(1, 2), Edge::new(2, 3), Edge::new(3, 4)]);
    }

    #[test]
    fn diamond_builds_fork_and_join() {
        let edges = diamond(1, 2, 3, 4);
        assert_eq!(
            edges,
            vec![Edge::new(1, 2), Edge::new(1, 3), Edge::new(2, 4), Edge::new(3, 4)]
        );
    }

    #[test]
    fn wide_diamond_fans_every_fork_into_both_mids() {
        let edges = wide_diamond(&[1, 2, 3], 10, 11, 20);
        assert_eq!(edges.len(), 3 * 2 + 2);
        assert!(edges.contains(&Edge::new(2, 11)));
    }
}
