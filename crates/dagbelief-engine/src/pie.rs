use std::collections::HashMap;

use dagbelief_algebra::ops::{add, sub};
use dagbelief_algebra::Prob;
use dagbelief_diamonds::UniqueDiamond;

use crate::engine::{base_sub_priors, propagate_layers, Ctx};
use crate::error::EngineError;

/// Inclusion-exclusion fallback for diamonds whose highest-node count
/// exceeds `options.max_enum_highest`. Each non-empty subset `S` of the
/// highest nodes contributes one term: propagate the sub-DAG with every
/// `h` in `S` forced active and every other highest node forced inactive,
/// take the resulting belief at the join as `P(⋂_{h∈S} E_h)`, and add it
/// with sign `(-1)^(|S|+1)`.
///
/// This evaluates one subset's sub-DAG propagation at a time rather than
/// materializing a `2^|H|`-entry conditioning table, bounding memory to
/// `O(sub-DAG size)`; the per-subset propagation uses only cases S/T/M, so
/// a nested diamond inside this diamond falls through to case M here
/// instead of recursing into its own conditioning.
pub(crate) fn inclusion_exclusion(
    ctx: &Ctx<'_>,
    diamond: &UniqueDiamond,
) -> Result<Prob, EngineError> {
    let h = &diamond.descriptor.highest_nodes;
    let n = h.len();
    let total_masks = 1usize << n;
    let base_priors = base_sub_priors(ctx, &diamond.sub_layers);
    let mut acc = Prob::Scalar(0.0);

    for mask in 1..total_masks {
        if ctx.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let mut sigma_priors = base_priors.clone();
        for (i, &hnode) in h.iter().enumerate() {
            let active = (mask >> i) & 1 == 1;
            sigma_priors.insert(hnode, Prob::Scalar(if active { 1.0 } else { 0.0 }));
        }

        let sub_beliefs = propagate_layers(ctx, &diamond.sub_layers, &sigma_priors, &HashMap::new())?;
        let term = sub_beliefs
            .get(&diamond.descriptor.join)
            .expect("join is part of its own diamond sub-DAG")
            .clone();

        let k = (mask as u32).count_ones();
        acc = if k % 2 == 1 {
            add(&acc, &term)
        } else {
            sub(&acc, &term)
        };
    }

    Ok(acc)
}
