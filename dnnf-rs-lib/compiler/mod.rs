//! Recursive, d-tree-guided compilation of CNF into d-DNNF.
//!
//! The compiler walks the d-tree top-down, Shannon-expanding on dynamic
//! separator variables until the two halves of a node decouple, then
//! compiles them independently. A specialized incremental SAT engine prunes
//! unsatisfiable branches and supplies the forced literals along the way.
pub mod compiler;
pub mod dnnf;
pub mod handler;
pub mod options;

pub use crate::compiler::compiler::*;
pub use crate::compiler::dnnf::*;
