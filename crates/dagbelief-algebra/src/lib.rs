//! Polymorphic probability algebra: scalar, interval, and p-box values
//! closed under `mul`/`comp`/`add`/`sub`, with tag promotion on mixed-type
//! operations.

pub mod error;
pub mod ops;
pub mod pbox;
pub mod value;

pub use error::AlgebraError;
pub use value::{Pbox, Prob, ProbTag, DEFAULT_EPSILON, PBOX_DEFAULT_LEVELS};
