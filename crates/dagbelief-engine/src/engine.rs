use std::collections::HashMap;

use dagbelief_algebra::ops::{mul, or_independent};
use dagbelief_algebra::Prob;
use dagbelief_diamonds::{DiamondKey, DiamondStore};
use dagbelief_graph::{
    classify_forks_joins, compute_layers_and_closures, Edge, GraphError, GraphIndex, Layers, NodeId,
};
use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::diamond;
use crate::error::EngineError;
use crate::options::{CancellationToken, ComputeOptions};

pub type PriorMap = HashMap<NodeId, Prob>;
pub type EdgeProbMap = HashMap<(NodeId, NodeId), Prob>;

/// Everything a node's belief computation needs that doesn't change across
/// a single `compute_beliefs` call, threaded through by reference so the
/// layer-synchronous parallel pass and the recursive diamond conditioning
/// passes share one view of the graph.
pub(crate) struct Ctx<'a> {
    pub index: &'a GraphIndex,
    pub priors: &'a PriorMap,
    pub edge_probs: &'a EdgeProbMap,
    pub store: &'a DiamondStore,
    pub options: &'a ComputeOptions,
    pub cancel: &'a CancellationToken,
}

/// Compute the exact belief (reachability probability, accounting for
/// re-convergent-path correlation) of every node in the graph described by
/// `edges`, given per-node priors and per-edge transmission probabilities.
///
/// Fails fast on structural problems (cycles, self-loops, duplicate edges),
/// missing priors/edge probabilities, or mixed `Prob` representations
/// across the inputs.
pub fn compute_beliefs(
    edges: impl IntoIterator<Item = Edge>,
    priors: PriorMap,
    edge_probs: EdgeProbMap,
    options: ComputeOptions,
) -> Result<HashMap<NodeId, Prob>, EngineError> {
    compute_beliefs_cancellable(edges, priors, edge_probs, options, &CancellationToken::new())
}

/// Same as [`compute_beliefs`], but checked for cancellation between layers
/// and between a diamond's conditioning sub-problems.
#[instrument(skip_all)]
pub fn compute_beliefs_cancellable(
    edges: impl IntoIterator<Item = Edge>,
    priors: PriorMap,
    edge_probs: EdgeProbMap,
    options: ComputeOptions,
    cancel: &CancellationToken,
) -> Result<HashMap<NodeId, Prob>, EngineError> {
    let index = GraphIndex::build(edges)?;
    validate_inputs(&index, &priors, &edge_probs)?;

    let fj = classify_forks_joins(&index);
    let (layers, closures) = compute_layers_and_closures(&index)?;
    debug!(nodes = index.node_count(), joins = fj.joins.len(), "graph indexed");

    let store = DiamondStore::build(&index, &fj, &closures, &priors);
    let stats = store.stats();
    debug!(
        unique = stats.unique_diamond_count,
        roots = stats.root_diamond_count,
        max_depth = stats.max_nesting_depth,
        "diamond store built"
    );

    let root_diamonds: HashMap<NodeId, DiamondKey> = fj
        .joins
        .iter()
        .filter_map(|&j| store.root_for_join(j).map(|key| (j, key)))
        .collect();

    let ctx = Ctx {
        index: &index,
        priors: &priors,
        edge_probs: &edge_probs,
        store: &store,
        options: &options,
        cancel,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.parallelism)
        .build()
        .expect("building a bounded rayon thread pool from a validated thread count");
    pool.install(|| propagate_layers(&ctx, &layers, &priors, &root_diamonds))
}

fn validate_inputs(
    index: &GraphIndex,
    priors: &PriorMap,
    edge_probs: &EdgeProbMap,
) -> Result<(), EngineError> {
    for node in index.nodes() {
        if !priors.contains_key(&node) {
            return Err(EngineError::MissingPrior { node });
        }
    }
    for edge in index.edgelist() {
        if !edge_probs.contains_key(&(edge.source, edge.target)) {
            return Err(EngineError::MissingEdgeProb {
                source: edge.source,
                target: edge.target,
            });
        }
    }
    for &node in priors.keys() {
        if !index.contains(node) {
            return Err(EngineError::Structural(GraphError::UnknownNode { node }));
        }
    }
    for &(source, target) in edge_probs.keys() {
        if !index.contains(source) {
            return Err(EngineError::Structural(GraphError::UnknownNode { node: source }));
        }
        if !index.contains(target) {
            return Err(EngineError::Structural(GraphError::UnknownNode { node: target }));
        }
    }

    let mut tags = priors
        .values()
        .map(Prob::tag)
        .chain(edge_probs.values().map(Prob::tag));
    if let Some(first) = tags.next() {
        for other in tags {
            if other != first {
                return Err(EngineError::MixedProbabilityTags { a: first, b: other });
            }
        }
    }
    Ok(())
}

/// Run one layer-synchronous propagation pass over `layers`, honoring
/// `diamond_lookup` for which joins in this pass are diamonds. Used both for
/// the top-level graph and, recursively, for a diamond's own induced
/// sub-DAG under a conditioning assignment (where `active_priors` carries
/// the degenerate 0/1 priors substituted for the highest nodes).
pub(crate) fn propagate_layers(
    ctx: &Ctx<'_>,
    layers: &Layers,
    active_priors: &PriorMap,
    diamond_lookup: &HashMap<NodeId, DiamondKey>,
) -> Result<HashMap<NodeId, Prob>, EngineError> {
    let mut beliefs: HashMap<NodeId, Prob> = HashMap::with_capacity(active_priors.len());
    for layer in &layers.layers {
        if ctx.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let computed: Vec<(NodeId, Result<Prob, EngineError>)> = layer
            .par_iter()
            .map(|&v| {
                (
                    v,
                    compute_node_belief(ctx, v, active_priors, &beliefs, diamond_lookup),
                )
            })
            .collect();
        for (v, result) in computed {
            let belief = result?;
            check_numeric(ctx, v, &belief)?;
            beliefs.insert(v, belief);
        }
    }
    Ok(beliefs)
}

fn check_numeric(ctx: &Ctx<'_>, node: NodeId, belief: &Prob) -> Result<(), EngineError> {
    let (lo, hi) = belief.to_interval();
    let eps = ctx.options.epsilon;
    if lo < -eps || hi > 1.0 + eps {
        return Err(EngineError::NumericOutOfRange {
            node,
            value: if lo < -eps { lo } else { hi },
        });
    }
    Ok(())
}

fn compute_node_belief(
    ctx: &Ctx<'_>,
    v: NodeId,
    active_priors: &PriorMap,
    beliefs: &HashMap<NodeId, Prob>,
    diamond_lookup: &HashMap<NodeId, DiamondKey>,
) -> Result<Prob, EngineError> {
    let prior_v = active_priors
        .get(&v)
        .ok_or(EngineError::MissingPrior { node: v })?;
    let incoming = ctx.index.incoming(v);

    if incoming.is_empty() {
        trace!(node = v, "case S: source");
        return Ok(prior_v.clone());
    }

    if let Some(&key) = diamond_lookup.get(&v) {
        trace!(node = v, "case D: diamond join");
        let unique = ctx
            .store
            .get(key)
            .expect("diamond store entry must exist for a registered join");
        let factor = diamond::contribution(ctx, &unique, beliefs)?;
        return Ok(mul(prior_v, &factor));
    }

    if incoming.len() == 1 {
        trace!(node = v, "case T: single parent");
        let u = incoming[0];
        let belief_u = beliefs
            .get(&u)
            .expect("predecessor belief already computed in an earlier layer");
        let ep = edge_prob(ctx, u, v)?;
        return Ok(mul(prior_v, &mul(belief_u, &ep)));
    }

    trace!(node = v, parents = incoming.len(), "case M: independent parents");
    let mut terms = Vec::with_capacity(incoming.len());
    for &u in incoming {
        let belief_u = beliefs
            .get(&u)
            .expect("predecessor belief already computed in an earlier layer");
        let ep = edge_prob(ctx, u, v)?;
        terms.push(mul(belief_u, &ep));
    }
    let any = or_independent(terms.iter());
    Ok(mul(prior_v, &any))
}

pub(crate) fn edge_prob(ctx: &Ctx<'_>, source: NodeId, target: NodeId) -> Result<Prob, EngineError> {
    ctx.edge_probs
        .get(&(source, target))
        .cloned()
        .ok_or(EngineError::MissingEdgeProb { source, target })
}

/// Seed a sub-DAG's prior map from the global priors, for every node the
/// sub-DAG's layering actually spans. Callers then override the highest
/// nodes' entries with the conditioning assignment under test.
pub(crate) fn base_sub_priors(ctx: &Ctx<'_>, sub_layers: &Layers) -> PriorMap {
    let mut out = HashMap::new();
    for layer in &sub_layers.layers {
        for &node in layer {
            if let Some(p) = ctx.priors.get(&node) {
                out.insert(node, p.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagbelief_graph::Edge;

    fn edges(pairs: &[(u64, u64)]) -> Vec<Edge> {
        pairs.iter().map(|&(s, t)| Edge::new(s, t)).collect()
    }

    fn scalars(pairs: &[(u64, f64)]) -> PriorMap {
        pairs.iter().map(|&(n, x)| (n, Prob::Scalar(x))).collect()
    }

    fn edge_scalars(pairs: &[((u64, u64), f64)]) -> EdgeProbMap {
        pairs.iter().map(|&(e, x)| (e, Prob::Scalar(x))).collect()
    }

    #[test]
    fn single_edge_chain_is_plain_multiplication() {
        let beliefs = compute_beliefs(
            edges(&[(1, 2)]),
            scalars(&[(1, 0.9), (2, 1.0)]),
            edge_scalars(&[((1, 2), 0.5)]),
            ComputeOptions::default(),
        )
        .unwrap();
        let Prob::Scalar(b1) = beliefs[&1] else { panic!() };
        let Prob::Scalar(b2) = beliefs[&2] else { panic!() };
        assert!((b1 - 0.9).abs() < 1e-9);
        assert!((b2 - 0.9 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_prior_is_reported() {
        let err = compute_beliefs(
            edges(&[(1, 2)]),
            scalars(&[(1, 0.9)]),
            edge_scalars(&[((1, 2), 0.5)]),
            ComputeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MissingPrior { node: 2 }));
    }

    #[test]
    fn missing_edge_prob_is_reported() {
        let err = compute_beliefs(
            edges(&[(1, 2)]),
            scalars(&[(1, 0.9), (2, 1.0)]),
            EdgeProbMap::new(),
            ComputeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingEdgeProb {
                source: 1,
                target: 2
            }
        ));
    }

    #[test]
    fn prior_for_node_absent_from_edges_is_rejected() {
        let err = compute_beliefs(
            edges(&[(1, 2)]),
            scalars(&[(1, 0.9), (2, 1.0), (99, 0.5)]),
            edge_scalars(&[((1, 2), 0.5)]),
            ComputeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Structural(dagbelief_graph::GraphError::UnknownNode { node: 99 })
        ));
    }

    #[test]
    fn edge_prob_for_pair_absent_from_edges_is_rejected() {
        let err = compute_beliefs(
            edges(&[(1, 2)]),
            scalars(&[(1, 0.9), (2, 1.0)]),
            edge_scalars(&[((1, 2), 0.5), ((2, 99), 0.3)]),
            ComputeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Structural(dagbelief_graph::GraphError::UnknownNode { node: 99 })
        ));
    }

    #[test]
    fn mixed_tags_are_rejected() {
        let mut priors = scalars(&[(1, 0.9), (2, 1.0)]);
        priors.insert(2, Prob::Interval { lo: 0.5, hi: 0.6 });
        let err = compute_beliefs(
            edges(&[(1, 2)]),
            priors,
            edge_scalars(&[((1, 2), 0.5)]),
            ComputeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MixedProbabilityTags { .. }));
    }

    #[test]
    fn independent_parents_combine_via_or_independent() {
        let beliefs = compute_beliefs(
            edges(&[(1, 3), (2, 3)]),
            scalars(&[(1, 0.5), (2, 0.5), (3, 1.0)]),
            edge_scalars(&[((1, 3), 1.0), ((2, 3), 1.0)]),
            ComputeOptions::default(),
        )
        .unwrap();
        let Prob::Scalar(b3) = beliefs[&3] else { panic!() };
        assert!((b3 - 0.75).abs() < 1e-9);
    }
}
