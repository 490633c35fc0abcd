//! Reference oracles the engine's own tests check their results against:
//! exact brute-force enumeration over every primitive random variable
//! (small graphs only) and Monte Carlo forward sampling (any graph size, an
//! approximate check with a reported confidence interval). Neither oracle
//! calls `compute_beliefs` — both derive belief independently from the same
//! node-prior / edge-transmission semantics the engine implements, so a
//! mismatch is evidence of an engine bug rather than a circular check.

mod brute_force;
mod monte_carlo;

pub use brute_force::{brute_force_belief, BRUTE_FORCE_VARIABLE_LIMIT};
pub use monte_carlo::{monte_carlo_belief, MonteCarloEstimate, DEFAULT_MONTE_CARLO_TRIALS};

use dagbelief_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("graph is structurally invalid: {0}")]
    Structural(#[from] GraphError),

    #[error(
        "graph has {actual} primitive random variables (nodes + edges); brute force \
         enumeration is only tractable up to {limit}"
    )]
    TooLargeForBruteForce { actual: u32, limit: u32 },
}
