use std::fmt::Display;

use crate::literal::{Literal, Polarity, VariableIdx};

/// Solver literal packed into a single word: variable index shifted left,
/// lowest bit carrying the polarity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Lit(u32);

impl Lit {
    #[must_use]
    pub fn new(variable: VariableIdx, polarity: Polarity) -> Lit {
        Lit(variable.0 * 2 + u32::from(polarity == Polarity::Negative))
    }

    #[must_use]
    pub fn variable(self) -> VariableIdx {
        VariableIdx(self.0 >> 1)
    }

    #[must_use]
    pub fn polarity(self) -> Polarity {
        if self.0 & 1 == 0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }

    /// Index into literal-indexed arrays, e.g. watcher lists.
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

impl std::ops::Not for Lit {
    type Output = Self;

    fn not(self) -> Self::Output {
        Lit(self.0 ^ 1)
    }
}

impl From<Literal> for Lit {
    fn from(literal: Literal) -> Self {
        Lit::new(literal.variable(), literal.polarity())
    }
}

impl From<Lit> for Literal {
    fn from(lit: Lit) -> Self {
        Literal::new(lit.variable(), lit.polarity())
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Literal::from(*self))
    }
}

/// Value of a literal or variable under the current partial assignment.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tristate {
    True,
    False,
    Undef,
}

impl Tristate {
    #[must_use]
    pub fn negate(self) -> Tristate {
        match self {
            Tristate::True => Tristate::False,
            Tristate::False => Tristate::True,
            Tristate::Undef => Tristate::Undef,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

/// Id of a clause inside the engine's clause arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct ClauseId(pub(crate) usize);
