//! Incremental SAT engine driven by the d-DNNF compiler.
//!
//! The engine is not a general-purpose solver: it exposes exactly the narrow
//! decide/backtrack contract the compiler needs and uses conflict-driven
//! clause learning only as a pruning oracle. Each compilation constructs and
//! exclusively owns one engine instance.
pub mod engine;
pub mod types;

pub use crate::solver::engine::*;
pub use crate::solver::types::*;
