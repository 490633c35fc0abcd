use std::collections::HashMap;

use dagbelief_algebra::ops::{add, comp, mul, or_independent};
use dagbelief_algebra::Prob;
use dagbelief_diamonds::UniqueDiamond;
use dagbelief_graph::NodeId;

use crate::engine::{base_sub_priors, edge_prob, propagate_layers, Ctx};
use crate::error::EngineError;
use crate::pie;

/// Case D: the combined "reached via this diamond, or via a non-diamond
/// parent" factor for `diamond.descriptor.join`, i.e.
/// `or_independent([D(v), N(v)])`. The caller still multiplies this by the
/// join's own prior.
pub(crate) fn contribution(
    ctx: &Ctx<'_>,
    diamond: &UniqueDiamond,
    outer_beliefs: &HashMap<NodeId, Prob>,
) -> Result<Prob, EngineError> {
    let h = &diamond.descriptor.highest_nodes;
    let d_v = if h.len() <= ctx.options.max_enum_highest {
        enumerate_conditioning(ctx, diamond, outer_beliefs)?
    } else {
        pie::inclusion_exclusion(ctx, diamond)?
    };
    let n_v = non_diamond_parent_contribution(ctx, diamond, outer_beliefs)?;
    Ok(or_independent([d_v, n_v].iter()))
}

fn non_diamond_parent_contribution(
    ctx: &Ctx<'_>,
    diamond: &UniqueDiamond,
    outer_beliefs: &HashMap<NodeId, Prob>,
) -> Result<Prob, EngineError> {
    let join = diamond.descriptor.join;
    let mut terms = Vec::with_capacity(diamond.descriptor.non_diamond_parents.len());
    for &p in &diamond.descriptor.non_diamond_parents {
        let belief_p = outer_beliefs
            .get(&p)
            .expect("non-diamond parent belief already computed in an earlier layer");
        let ep = edge_prob(ctx, p, join)?;
        terms.push(mul(belief_p, &ep));
    }
    Ok(or_independent(terms.iter()))
}

/// Full `2^|H|` enumeration: for every assignment `σ` of the diamond's
/// highest nodes, recompute beliefs inside the diamond's own layers with
/// each `h` forced to a degenerate 0/1 prior, weight the resulting belief
/// at the join by `P(σ)` under `h`'s unconditioned belief, and sum the
/// weighted contributions. Nested diamonds recurse through case D again via
/// `diamond.nested_by_join`.
fn enumerate_conditioning(
    ctx: &Ctx<'_>,
    diamond: &UniqueDiamond,
    outer_beliefs: &HashMap<NodeId, Prob>,
) -> Result<Prob, EngineError> {
    let h = &diamond.descriptor.highest_nodes;
    let n = h.len();
    let total_masks = 1usize << n;
    let base_priors = base_sub_priors(ctx, &diamond.sub_layers);
    let mut acc = Prob::Scalar(0.0);

    for mask in 0..total_masks {
        if ctx.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let mut weight = Prob::Scalar(1.0);
        let mut sigma_priors = base_priors.clone();
        for (i, &hnode) in h.iter().enumerate() {
            let active = (mask >> i) & 1 == 1;
            let belief_original = outer_beliefs
                .get(&hnode)
                .expect("a highest node's belief is computed before its diamond's join");
            weight = mul(
                &weight,
                &if active {
                    belief_original.clone()
                } else {
                    comp(belief_original)
                },
            );
            sigma_priors.insert(hnode, Prob::Scalar(if active { 1.0 } else { 0.0 }));
        }

        let sub_beliefs = propagate_layers(
            ctx,
            &diamond.sub_layers,
            &sigma_priors,
            &diamond.nested_by_join,
        )?;
        let b_sigma_v = sub_beliefs
            .get(&diamond.descriptor.join)
            .expect("join is part of its own diamond sub-DAG")
            .clone();

        acc = add(&acc, &mul(&weight, &b_sigma_v));
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{CancellationToken, ComputeOptions};
    use dagbelief_diamonds::DiamondStore;
    use dagbelief_graph::{classify_forks_joins, compute_layers_and_closures, Edge, GraphIndex};

    #[test]
    fn enumeration_matches_hand_computed_diamond_scenario_a() {
        // 1 forks to 2 and 3, both reconverge at 4. prior(1)=0.8,
        // edge(1,2)=0.9, edge(1,3)=0.7, edge(2,4)=1, edge(3,4)=1, prior(4)=1.
        // D(4) = 0.8 * (1 - (1-0.9)*(1-0.7)) = 0.8 * 0.97 = 0.776.
        let index = GraphIndex::build([Edge::new(1, 2), Edge::new(1, 3), Edge::new(2, 4), Edge::new(3, 4)]).unwrap();
        let fj = classify_forks_joins(&index);
        let (layers, closures) = compute_layers_and_closures(&index).unwrap();
        let mut priors: HashMap<NodeId, Prob> = HashMap::new();
        priors.insert(1, Prob::Scalar(0.8));
        priors.insert(2, Prob::Scalar(1.0));
        priors.insert(3, Prob::Scalar(1.0));
        priors.insert(4, Prob::Scalar(1.0));
        let mut edge_probs: HashMap<(NodeId, NodeId), Prob> = HashMap::new();
        edge_probs.insert((1, 2), Prob::Scalar(0.9));
        edge_probs.insert((1, 3), Prob::Scalar(0.7));
        edge_probs.insert((2, 4), Prob::Scalar(1.0));
        edge_probs.insert((3, 4), Prob::Scalar(1.0));

        let store = DiamondStore::build(&index, &fj, &closures, &priors);
        let options = ComputeOptions::default();
        let cancel = CancellationToken::new();
        let ctx = Ctx {
            index: &index,
            priors: &priors,
            edge_probs: &edge_probs,
            store: &store,
            options: &options,
            cancel: &cancel,
        };
        let root_diamonds: HashMap<NodeId, dagbelief_diamonds::DiamondKey> = fj
            .joins
            .iter()
            .filter_map(|&j| store.root_for_join(j).map(|k| (j, k)))
            .collect();

        let beliefs = propagate_layers(&ctx, &layers, &priors, &root_diamonds).unwrap();
        let Prob::Scalar(b4) = beliefs[&4] else {
            panic!("expected scalar")
        };
        assert!((b4 - 0.776).abs() < 1e-9, "got {b4}");
    }
}
