use std::collections::HashMap;

use dagbelief_graph::{classify_forks_joins, compute_layers_and_closures, Edge, GraphIndex, NodeId};

use super::OracleError;

/// Above this many primitive random variables (one Bernoulli per node's own
/// prior, one per edge's transmission probability), full `2^k` enumeration
/// stops being practical; callers with larger graphs should use
/// [`super::monte_carlo_belief`] instead.
pub const BRUTE_FORCE_VARIABLE_LIMIT: u32 = 24;

/// Exact belief for every node, computed by enumerating every joint outcome
/// of the graph's primitive random variables directly — independent of the
/// engine's own layered/diamond-conditioned algorithm. This is the ground
/// truth a small test graph's `compute_beliefs` result is checked against.
///
/// A node's own Bernoulli trial and each of its incoming edges' Bernoulli
/// trials are drawn once per joint outcome and shared across every path
/// that reuses them, which is what makes this a faithful (if expensive)
/// reference for re-convergent-path correlation: a diamond's shared
/// ancestor contributes the exact same bit to every downstream use, the
/// same guarantee the engine's diamond conditioning exists to preserve.
pub fn brute_force_belief(
    edges: &[Edge],
    priors: &HashMap<NodeId, f64>,
    edge_probs: &HashMap<(NodeId, NodeId), f64>,
) -> Result<HashMap<NodeId, f64>, OracleError> {
    let index = GraphIndex::build(edges.iter().copied())?;
    let _ = classify_forks_joins(&index);
    let (layers, _closures) = compute_layers_and_closures(&index)?;
    let topo_order: Vec<NodeId> = layers.layers.iter().flatten().copied().collect();
    let edgelist: Vec<Edge> = index.edgelist().to_vec();

    let n_vars = topo_order.len() + edgelist.len();
    let n_vars_u32 = u32::try_from(n_vars).unwrap_or(u32::MAX);
    if n_vars_u32 > BRUTE_FORCE_VARIABLE_LIMIT {
        return Err(OracleError::TooLargeForBruteForce {
            actual: n_vars_u32,
            limit: BRUTE_FORCE_VARIABLE_LIMIT,
        });
    }

    let mut sums: HashMap<NodeId, f64> = topo_order.iter().map(|&v| (v, 0.0)).collect();
    let total_masks: u64 = 1u64 << n_vars;

    for mask in 0..total_masks {
        let mut prob = 1.0f64;
        let mut node_bit: HashMap<NodeId, bool> = HashMap::with_capacity(topo_order.len());
        for (i, &v) in topo_order.iter().enumerate() {
            let bit = (mask >> i) & 1 == 1;
            let p = priors[&v];
            prob *= if bit { p } else { 1.0 - p };
            node_bit.insert(v, bit);
        }
        let mut edge_bit: HashMap<(NodeId, NodeId), bool> = HashMap::with_capacity(edgelist.len());
        for (j, e) in edgelist.iter().enumerate() {
            let bit = (mask >> (topo_order.len() + j)) & 1 == 1;
            let p = edge_probs[&(e.source, e.target)];
            prob *= if bit { p } else { 1.0 - p };
            edge_bit.insert((e.source, e.target), bit);
        }
        if prob == 0.0 {
            continue;
        }

        let mut active: HashMap<NodeId, bool> = HashMap::with_capacity(topo_order.len());
        for &v in &topo_order {
            let own = node_bit[&v];
            let incoming = index.incoming(v);
            let reached =
                incoming.is_empty() || incoming.iter().any(|&u| edge_bit[&(u, v)] && active[&u]);
            active.insert(v, own && reached);
        }

        for (&v, sum) in sums.iter_mut() {
            if active[&v] {
                *sum += prob;
            }
        }
    }

    Ok(sums)
}
