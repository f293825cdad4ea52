use derive_more::derive::From;
use std::fmt::Display;

/// Index of a variable. This corresponds to the order in which the variable
/// was created in [`crate::formula::FormulaFactory`], not a formula id.
#[derive(PartialEq, Eq, Clone, PartialOrd, Ord, Debug, Copy, Hash, From)]
pub struct VariableIdx(pub u32);

impl From<usize> for VariableIdx {
    fn from(value: usize) -> Self {
        VariableIdx(u32::try_from(value).expect("variable index must fit into u32"))
    }
}

impl VariableIdx {
    /// Get the index as a plain `usize`, e.g. for indexing bitsets.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for VariableIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variable given by its name (label) and index.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Variable {
    label: String,
    idx: VariableIdx,
}

impl Variable {
    #[must_use]
    pub(crate) fn new(label: &str, idx: u32) -> Variable {
        Variable {
            label: label.to_owned(),
            idx: VariableIdx(idx),
        }
    }

    /// Get the name (label) of a variable.
    #[must_use]
    pub fn label(&self) -> String {
        self.label.clone()
    }

    /// Get the index of a variable.
    pub fn index(&self) -> VariableIdx {
        self.idx
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.idx.cmp(&other.idx)
    }
}

/// Polarity of a variable.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Copy, Hash)]
pub enum Polarity {
    Positive,
    Negative,
}

impl From<bool> for Polarity {
    fn from(item: bool) -> Self {
        if item {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }
}

impl std::ops::Not for Polarity {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

/// Literal given by [`VariableIdx`] and [`Polarity`].
#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct Literal {
    variable: VariableIdx,
    polarity: Polarity,
}

impl Literal {
    /// Create a new [`Literal`].
    #[must_use]
    pub fn new(variable: VariableIdx, polarity: Polarity) -> Literal {
        Literal { variable, polarity }
    }

    /// Get the same literal with the opposite polarity.
    #[must_use]
    pub fn negate(&self) -> Literal {
        Literal {
            variable: self.variable,
            polarity: !self.polarity,
        }
    }

    /// Check whether [`self`] is negated [`other`].
    #[must_use]
    pub fn eq_negated(&self, other: &Literal) -> bool {
        self.variable == other.variable && self.polarity != other.polarity
    }

    #[must_use]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    #[must_use]
    pub fn variable(&self) -> VariableIdx {
        self.variable
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let polarity = if self.polarity == Polarity::Positive {
            ""
        } else {
            "!"
        };
        write!(f, "{}x{}", polarity, self.variable)
    }
}

#[cfg(test)]
mod test {
    use super::{Literal, Polarity, VariableIdx};

    #[test]
    fn polarity_negation() {
        assert_eq!(!Polarity::Positive, Polarity::Negative);
        assert_eq!(!Polarity::Negative, Polarity::Positive);
        assert_eq!(Polarity::from(true), Polarity::Positive);
        assert_eq!(Polarity::from(false), Polarity::Negative);
    }

    #[test]
    fn literal_negation() {
        let lit = Literal::new(VariableIdx(3), Polarity::Positive);
        assert_eq!(lit.negate().polarity(), Polarity::Negative);
        assert_eq!(lit.negate().variable(), lit.variable());
        assert!(lit.eq_negated(&lit.negate()));
        assert!(!lit.eq_negated(&lit));
        assert_eq!(lit.negate().negate(), lit);
    }
}
