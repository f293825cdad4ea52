//! Immutable, hash-consed Boolean formula DAG and its CNF carrier types.
pub mod cnf;
pub mod formula;

pub use crate::formula::cnf::*;
pub use crate::formula::formula::*;
