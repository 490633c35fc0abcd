use std::collections::{HashMap, HashSet};

use dagbelief_algebra::Prob;
use dagbelief_graph::{Closures, Edge, ForkJoin, GraphIndex, NodeId};

/// A join node's diamond substructure: the maximal induced sub-DAG whose
/// paths, originating at shared fork ancestors (`highest_nodes`), reconverge
/// at `join`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiamondDescriptor {
    pub join: NodeId,
    /// Vertex set of the finalized edge list, ascending by id.
    pub relevant_nodes: Vec<NodeId>,
    /// Conditioning roots: fork ancestors shared by 2+ parents of `join`.
    /// Non-empty by construction (`find_diamond` returns `None` otherwise).
    /// Ascending by id.
    pub highest_nodes: Vec<NodeId>,
    /// Induced edges after the completeness pass, in source-edgelist order.
    pub edgelist: Vec<Edge>,
    /// Parents of `join` outside `relevant_nodes`; contribute independently.
    pub non_diamond_parents: Vec<NodeId>,
}

/// Run the 8-step diamond identification algorithm for a single join node.
/// Returns `None` if `join` has no diamond (its conditioning-root set is
/// empty after filtering out degenerate sources).
pub fn find_diamond(
    join: NodeId,
    index: &GraphIndex,
    fj: &ForkJoin,
    closures: &Closures,
    priors: &HashMap<NodeId, Prob>,
) -> Option<DiamondDescriptor> {
    // Step 1: A = union of ancestors of join's parents, plus the parents themselves.
    let mut a: HashSet<NodeId> = HashSet::new();
    for &p in index.incoming(join) {
        a.insert(p);
        if let Some(anc_p) = closures.ancestors(p) {
            a.extend(anc_p.iter(index));
        }
    }

    // Step 2: restrict to forks.
    a.retain(|v| fj.forks.contains(v));

    // Step 3: drop sources whose prior is exactly 0 — they can never
    // activate, so every path depending on them is vacuous. A prior of
    // exactly 1 is kept: it's still the root the diamond's paths fork
    // from, even though its own activation carries no uncertainty (see
    // scenario D in DESIGN.md for why this departs from a literal
    // `is_zero_or_one` test).
    let sources: HashSet<NodeId> = index.sources().iter().copied().collect();
    a.retain(|v| {
        if !sources.contains(v) {
            return true;
        }
        match priors.get(v) {
            Some(p) => !p.equal_to_zero(),
            None => true,
        }
    });
    if a.is_empty() {
        return None;
    }

    // Step 4: candidate relevant set R = A ∪ {join} ∪ (descendants(a) ∩ ancestors(join), a ∈ A).
    let mut r: HashSet<NodeId> = a.clone();
    r.insert(join);
    if let Some(anc_join) = closures.ancestors(join) {
        for &av in &a {
            if let Some(desc_av) = closures.descendants(av) {
                for d in desc_av.iter(index) {
                    if anc_join.contains(index, d) {
                        r.insert(d);
                    }
                }
            }
        }
    }

    // Step 5: induced edges.
    let mut e_prime: Vec<Edge> = index
        .edgelist()
        .iter()
        .copied()
        .filter(|e| r.contains(&e.source) && r.contains(&e.target))
        .collect();

    // Step 6: sub-sources of the induced sub-DAG, and highest_nodes = A ∩ sub_sources.
    let mut r_nodes: Vec<NodeId> = r.iter().copied().collect();
    r_nodes.sort_unstable();
    let has_incoming: HashSet<NodeId> = e_prime.iter().map(|e| e.target).collect();
    let sub_sources: HashSet<NodeId> = r_nodes
        .iter()
        .copied()
        .filter(|n| !has_incoming.contains(n))
        .collect();
    let mut highest_nodes: Vec<NodeId> = a
        .iter()
        .copied()
        .filter(|n| sub_sources.contains(n))
        .collect();
    highest_nodes.sort_unstable();
    if highest_nodes.is_empty() {
        return None;
    }

    // Step 7: completeness pass — every intermediate node's full incoming
    // edge set is pulled in, even from nodes outside the original R.
    for &m in &r_nodes {
        if sub_sources.contains(&m) || m == join {
            continue;
        }
        for &u in index.incoming(m) {
            r.insert(u);
            let edge = Edge::new(u, m);
            if !e_prime.contains(&edge) {
                e_prime.push(edge);
            }
        }
    }

    // Step 8: finalize.
    let edge_order: HashMap<Edge, usize> = index
        .edgelist()
        .iter()
        .enumerate()
        .map(|(i, e)| (*e, i))
        .collect();
    e_prime.sort_by_key(|e| edge_order.get(e).copied().unwrap_or(usize::MAX));

    let mut relevant_nodes: HashSet<NodeId> = HashSet::new();
    for e in &e_prime {
        relevant_nodes.insert(e.source);
        relevant_nodes.insert(e.target);
    }
    let mut relevant_nodes: Vec<NodeId> = relevant_nodes.into_iter().collect();
    relevant_nodes.sort_unstable();
    let relevant_set: HashSet<NodeId> = relevant_nodes.iter().copied().collect();

    let non_diamond_parents: Vec<NodeId> = index
        .incoming(join)
        .iter()
        .copied()
        .filter(|p| !relevant_set.contains(p))
        .collect();

    Some(DiamondDescriptor {
        join,
        relevant_nodes,
        highest_nodes,
        edgelist: e_prime,
        non_diamond_parents,
    })
}
