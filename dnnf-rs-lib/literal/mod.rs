//! Variables, polarities, and literals.
pub mod literal;

pub use crate::literal::literal::*;
