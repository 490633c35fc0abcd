use std::collections::HashMap;

use dagbelief_graph::{compute_layers_and_closures, Edge, GraphIndex, NodeId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::OracleError;

/// Default trial count for a Monte Carlo belief estimate: enough for a
/// tight 99% confidence interval on beliefs away from the extremes.
pub const DEFAULT_MONTE_CARLO_TRIALS: u32 = 1_000_000;

/// A sampled belief estimate together with its 99% confidence half-width
/// (normal approximation to the underlying binomial proportion).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonteCarloEstimate {
    pub mean: f64,
    pub ci99_halfwidth: f64,
}

impl MonteCarloEstimate {
    /// Whether `exact` falls inside this estimate's 99% interval.
    pub fn contains(&self, exact: f64) -> bool {
        (exact - self.mean).abs() <= self.ci99_halfwidth
    }
}

const Z_99: f64 = 2.576;

/// Approximate belief for every node via forward sampling: draw each node's
/// own Bernoulli(prior) and each edge's Bernoulli(transmission probability)
/// independently per trial, propagate activation in topological order, and
/// average the indicator over `trials` runs. `seed` makes a call
/// reproducible across test runs.
pub fn monte_carlo_belief(
    edges: &[Edge],
    priors: &HashMap<NodeId, f64>,
    edge_probs: &HashMap<(NodeId, NodeId), f64>,
    trials: u32,
    seed: u64,
) -> Result<HashMap<NodeId, MonteCarloEstimate>, OracleError> {
    let index = GraphIndex::build(edges.iter().copied())?;
    let (layers, _closures) = compute_layers_and_closures(&index)?;
    let topo_order: Vec<NodeId> = layers.layers.iter().flatten().copied().collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts: HashMap<NodeId, u64> = topo_order.iter().map(|&v| (v, 0)).collect();

    for _ in 0..trials {
        let mut active: HashMap<NodeId, bool> = HashMap::with_capacity(topo_order.len());
        for &v in &topo_order {
            let own = rng.random_bool(priors[&v]);
            let incoming = index.incoming(v);
            let reached = incoming.is_empty()
                || incoming
                    .iter()
                    .any(|&u| active[&u] && rng.random_bool(edge_probs[&(u, v)]));
            active.insert(v, own && reached);
        }
        for (&v, count) in counts.iter_mut() {
            if active[&v] {
                *count += 1;
            }
        }
    }

    let n = f64::from(trials);
    Ok(counts
        .into_iter()
        .map(|(v, c)| {
            let mean = c as f64 / n;
            let variance = (mean * (1.0 - mean) / n).max(0.0);
            let ci99_halfwidth = Z_99 * variance.sqrt();
            (v, MonteCarloEstimate { mean, ci99_halfwidth })
        })
        .collect())
}
