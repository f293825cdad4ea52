//! # Top-down compiler for deterministic decomposable negation normal forms.
//!
//! Compile CNF formulas into
//! [d-DNNF](https://en.wikipedia.org/wiki/Negation_normal_form): a succinct
//! representation of Boolean functions in which conjuncts share no variables
//! and disjuncts are pairwise model-disjoint.
//!
//! The compiler recurses over a binary decomposition tree (d-tree) built over
//! the clauses of the input CNF and drives a specialized incremental SAT
//! solver which prunes unsatisfiable branches via conflict-driven clause
//! learning.
//!
//! The following snippet compiles the function `(a ∨ b) ∧ (¬a ∨ c)` and
//! checks the result:
//!
//! ```rust
//! use dnnfrs::compiler::{self, handler::NopHandler, options::CompilerOptions};
//! use dnnfrs::formula::{Clause, Cnf, FormulaFactory};
//! use dnnfrs::literal::{Literal, Polarity};
//!
//! let f = FormulaFactory::new();
//! let a = f.variable("a");
//! let b = f.variable("b");
//! let c = f.variable("c");
//!
//! let cnf = Cnf::new(vec![
//!     Clause::new(vec![
//!         Literal::new(a, Polarity::Positive),
//!         Literal::new(b, Polarity::Positive),
//!     ]),
//!     Clause::new(vec![
//!         Literal::new(a, Polarity::Negative),
//!         Literal::new(c, Polarity::Positive),
//!     ]),
//! ]);
//!
//! let dnnf = compiler::compile(&f, &cnf, &CompilerOptions::default(), &mut NopHandler)
//!     .expect("no handler is installed, compilation cannot be canceled");
//! assert_eq!(dnnf.variables().len(), 3);
//! ```
//!
//! Compilation recurses as deep as the d-tree; callers compiling very large
//! CNFs must provide a call stack proportional to the d-tree depth, which is
//! at most the number of non-unit clauses.
pub mod compiler;
pub mod dtree;
pub mod formula;
pub mod literal;
pub mod solver;
