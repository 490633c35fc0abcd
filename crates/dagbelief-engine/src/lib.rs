//! Layered belief propagation over a DAG: independent tree edges (case T),
//! independent multi-parent fan-in (case M), and diamond conditioning over
//! shared fork ancestors (case D), falling back to inclusion-exclusion (PIE)
//! when a diamond's highest-node count makes full enumeration impractical.

mod diamond;
mod engine;
mod pie;

pub mod error;
pub mod options;

pub use engine::{compute_beliefs, compute_beliefs_cancellable, EdgeProbMap, PriorMap};
pub use error::EngineError;
pub use options::{CancellationToken, ComputeOptions, DEFAULT_MAX_ENUM_HIGHEST};
