use std::collections::BTreeSet;
use std::fmt::Display;

use crate::literal::{Literal, VariableIdx};

/// A disjunction of literals. The literal order is preserved; the compiler
/// walks it when turning a clause into a deterministic disjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    literals: Vec<Literal>,
}

impl Clause {
    #[must_use]
    pub fn new(literals: Vec<Literal>) -> Clause {
        Clause { literals }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let literals: Vec<_> = self.literals.iter().map(Literal::to_string).collect();
        write!(f, "({})", literals.join(" | "))
    }
}

/// A formula in conjunctive normal form, partitioned into unit clauses
/// (single literals, true unconditionally) and non-unit clauses. Only the
/// non-unit part is handed to the recursive compilation; unit clauses are
/// conjoined back onto the final result.
#[derive(Debug, Clone)]
pub struct Cnf {
    units: Vec<Literal>,
    non_units: Vec<Clause>,
    variables: BTreeSet<VariableIdx>,
    num_variables: usize,
}

impl Cnf {
    /// Normalize `clauses` and partition them into the unit and non-unit
    /// parts. Duplicate literals are dropped and tautological clauses
    /// discarded; both preserve equivalence, and the compilation relies on
    /// every leaf clause mentioning each variable at most once. An empty
    /// clause is kept in the non-unit part and makes the formula
    /// unsatisfiable. Variables are recorded before normalization, so even
    /// variables occurring only in tautologies survive.
    #[must_use]
    pub fn new(clauses: Vec<Clause>) -> Cnf {
        let mut units = Vec::new();
        let mut non_units = Vec::new();
        let mut variables = BTreeSet::new();

        for clause in clauses {
            for literal in clause.literals() {
                variables.insert(literal.variable());
            }

            let mut literals: Vec<Literal> = Vec::with_capacity(clause.len());
            let mut tautological = false;
            for &literal in clause.literals() {
                if literals.contains(&literal.negate()) {
                    tautological = true;
                    break;
                }
                if !literals.contains(&literal) {
                    literals.push(literal);
                }
            }
            if tautological {
                continue;
            }

            if literals.len() == 1 {
                units.push(literals[0]);
            } else {
                non_units.push(Clause::new(literals));
            }
        }

        let num_variables = variables.last().map_or(0, |v| v.index() + 1);

        Cnf {
            units,
            non_units,
            variables,
            num_variables,
        }
    }

    pub fn units(&self) -> &[Literal] {
        &self.units
    }

    pub fn non_units(&self) -> &[Clause] {
        &self.non_units
    }

    /// All variables occurring in the formula.
    pub fn variables(&self) -> &BTreeSet<VariableIdx> {
        &self.variables
    }

    /// One more than the largest occurring variable index; the size of every
    /// variable-indexed array during compilation.
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{Clause, Cnf};
    use crate::literal::{Literal, Polarity, VariableIdx};

    fn lit(var: u32, polarity: Polarity) -> Literal {
        Literal::new(VariableIdx(var), polarity)
    }

    #[test]
    fn partitioning() {
        let cnf = Cnf::new(vec![
            Clause::new(vec![lit(0, Polarity::Positive), lit(1, Polarity::Negative)]),
            Clause::new(vec![lit(2, Polarity::Positive)]),
            Clause::new(vec![lit(1, Polarity::Positive), lit(3, Polarity::Positive)]),
        ]);

        assert_eq!(cnf.units(), &[lit(2, Polarity::Positive)]);
        assert_eq!(cnf.non_units().len(), 2);
        assert_eq!(cnf.num_variables(), 4);
        assert_eq!(cnf.variables().len(), 4);
    }

    #[test]
    fn duplicate_literals_collapse() {
        let cnf = Cnf::new(vec![
            Clause::new(vec![lit(0, Polarity::Positive), lit(0, Polarity::Positive)]),
            Clause::new(vec![
                lit(1, Polarity::Negative),
                lit(1, Polarity::Negative),
                lit(2, Polarity::Positive),
            ]),
        ]);

        // (x0 ∨ x0) degenerates into the unit x0.
        assert_eq!(cnf.units(), &[lit(0, Polarity::Positive)]);
        assert_eq!(cnf.non_units().len(), 1);
        assert_eq!(
            cnf.non_units()[0].literals(),
            &[lit(1, Polarity::Negative), lit(2, Polarity::Positive)]
        );
    }

    #[test]
    fn tautological_clauses_are_dropped() {
        let cnf = Cnf::new(vec![
            Clause::new(vec![
                lit(0, Polarity::Positive),
                lit(0, Polarity::Negative),
                lit(1, Polarity::Positive),
            ]),
            Clause::new(vec![lit(2, Polarity::Positive), lit(3, Polarity::Positive)]),
        ]);

        assert!(cnf.units().is_empty());
        assert_eq!(cnf.non_units().len(), 1);
        // The tautology's variables still count as part of the formula.
        assert_eq!(cnf.variables().len(), 4);
        assert_eq!(cnf.num_variables(), 4);
    }

    #[test]
    fn empty_cnf() {
        let cnf = Cnf::new(vec![]);
        assert!(cnf.units().is_empty());
        assert!(cnf.non_units().is_empty());
        assert_eq!(cnf.num_variables(), 0);
    }
}
