//! Binary decomposition trees (d-trees) over the clauses of a CNF.
//!
//! A d-tree guides the compiler's case splits: its dynamic separators tell
//! which variables still couple the two halves of a subproblem. Trees are
//! built once by a [`generator`] before compilation and are read-only
//! afterwards, except for the one-time [`DTree::initialize`] call.
pub mod dtree;
pub mod generator;

pub use crate::dtree::dtree::*;
