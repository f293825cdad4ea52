use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt::Display;

use bitvec::slice::BitSlice;
use derive_more::derive::From;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::literal::{Literal, Polarity, Variable, VariableIdx};

/// Id of a formula inside its [`FormulaFactory`]. Structurally identical
/// formulas created by one factory always carry the same id.
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug, PartialOrd, Ord, From)]
pub struct FormulaId(pub(crate) u32);

impl Display for FormulaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FormulaId({})", self.0)
    }
}

pub(crate) const FALSE_FORMULA_ID: FormulaId = FormulaId(0);
pub(crate) const TRUE_FORMULA_ID: FormulaId = FormulaId(1);

/// A single node of the formula DAG. Operands are ids into the owning
/// [`FormulaFactory`].
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub enum FormulaNode {
    Falsum,
    Verum,
    Literal(Literal),
    And(Vec<FormulaId>),
    Or(Vec<FormulaId>),
}

/// Factory owning all formulas ever created through it. Nodes are
/// hash-consed: building the same conjunction twice yields the same
/// [`FormulaId`], which makes equality checks O(1).
///
/// The factory hands out ids instead of references, so formulas are cheap to
/// copy and store in caches.
#[derive(Debug, Default)]
pub struct FormulaFactory {
    nodes: RefCell<Vec<FormulaNode>>,
    unique: RefCell<FxHashMap<FormulaNode, FormulaId>>,
    variables: RefCell<Vec<Variable>>,
    labels: RefCell<FxHashMap<String, VariableIdx>>,
}

impl FormulaFactory {
    #[must_use]
    pub fn new() -> FormulaFactory {
        let nodes = vec![FormulaNode::Falsum, FormulaNode::Verum];
        let mut unique = FxHashMap::default();
        unique.insert(FormulaNode::Falsum, FALSE_FORMULA_ID);
        unique.insert(FormulaNode::Verum, TRUE_FORMULA_ID);

        FormulaFactory {
            nodes: RefCell::new(nodes),
            unique: RefCell::new(unique),
            variables: RefCell::new(Vec::new()),
            labels: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn falsum(&self) -> FormulaId {
        FALSE_FORMULA_ID
    }

    pub fn verum(&self) -> FormulaId {
        TRUE_FORMULA_ID
    }

    /// Get the variable named `label`, creating it if it does not exist yet.
    /// Variable indices are assigned densely in creation order.
    pub fn variable(&self, label: &str) -> VariableIdx {
        if let Some(idx) = self.labels.borrow().get(label) {
            return *idx;
        }

        let idx = VariableIdx::from(self.variables.borrow().len());
        self.variables
            .borrow_mut()
            .push(Variable::new(label, idx.0));
        self.labels.borrow_mut().insert(label.to_owned(), idx);
        idx
    }

    /// Number of variables created so far.
    pub fn variable_count(&self) -> usize {
        self.variables.borrow().len()
    }

    /// Get the [`Variable`] behind an index.
    ///
    /// # Panics
    ///
    /// Panics if no variable with such index was created.
    pub fn variable_of(&self, idx: VariableIdx) -> Variable {
        self.variables.borrow()[idx.index()].clone()
    }

    /// Get the formula representing a single literal.
    pub fn literal(&self, variable: VariableIdx, polarity: Polarity) -> FormulaId {
        self.intern(FormulaNode::Literal(Literal::new(variable, polarity)))
    }

    /// Conjoin formulas. Verum operands are dropped, a falsum operand
    /// short-circuits to falsum, nested conjunctions are flattened, and
    /// duplicates are removed. An empty conjunction is verum.
    pub fn and(&self, operands: &[FormulaId]) -> FormulaId {
        let mut ops = Vec::with_capacity(operands.len());
        let mut seen = FxHashSet::default();
        for &op in operands {
            match self.node(op) {
                FormulaNode::Verum => {}
                FormulaNode::Falsum => return FALSE_FORMULA_ID,
                FormulaNode::And(children) => {
                    for child in children {
                        if seen.insert(child) {
                            ops.push(child);
                        }
                    }
                }
                _ => {
                    if seen.insert(op) {
                        ops.push(op);
                    }
                }
            }
        }

        match ops.len() {
            0 => TRUE_FORMULA_ID,
            1 => ops[0],
            _ => self.intern(FormulaNode::And(ops)),
        }
    }

    /// Disjoin formulas. Falsum operands are dropped, a verum operand
    /// short-circuits to verum, nested disjunctions are flattened, and
    /// duplicates are removed. An empty disjunction is falsum.
    pub fn or(&self, operands: &[FormulaId]) -> FormulaId {
        let mut ops = Vec::with_capacity(operands.len());
        let mut seen = FxHashSet::default();
        for &op in operands {
            match self.node(op) {
                FormulaNode::Falsum => {}
                FormulaNode::Verum => return TRUE_FORMULA_ID,
                FormulaNode::Or(children) => {
                    for child in children {
                        if seen.insert(child) {
                            ops.push(child);
                        }
                    }
                }
                _ => {
                    if seen.insert(op) {
                        ops.push(op);
                    }
                }
            }
        }

        match ops.len() {
            0 => FALSE_FORMULA_ID,
            1 => ops[0],
            _ => self.intern(FormulaNode::Or(ops)),
        }
    }

    /// Get a clone of the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was created by a different factory.
    pub fn node(&self, id: FormulaId) -> FormulaNode {
        self.nodes.borrow()[id.0 as usize].clone()
    }

    /// Evaluate the formula under a total assignment. Bit `i` of `assignment`
    /// is the value of the variable with index `i`.
    pub fn evaluate(&self, id: FormulaId, assignment: &BitSlice) -> bool {
        match self.node(id) {
            FormulaNode::Falsum => false,
            FormulaNode::Verum => true,
            FormulaNode::Literal(lit) => {
                assignment[lit.variable().index()] == (lit.polarity() == Polarity::Positive)
            }
            FormulaNode::And(children) => children
                .iter()
                .all(|&child| self.evaluate(child, assignment)),
            FormulaNode::Or(children) => children
                .iter()
                .any(|&child| self.evaluate(child, assignment)),
        }
    }

    /// Collect all variables occurring in the formula.
    pub fn variables(&self, id: FormulaId) -> BTreeSet<VariableIdx> {
        let mut vars = BTreeSet::new();
        self.collect_variables(id, &mut vars);
        vars
    }

    /// Render the formula as text, mostly for debugging and test failures.
    pub fn display(&self, id: FormulaId) -> String {
        match self.node(id) {
            FormulaNode::Falsum => String::from("$false"),
            FormulaNode::Verum => String::from("$true"),
            FormulaNode::Literal(lit) => lit.to_string(),
            FormulaNode::And(children) => {
                let operands: Vec<_> = children.iter().map(|&c| self.display(c)).collect();
                format!("({})", operands.join(" & "))
            }
            FormulaNode::Or(children) => {
                let operands: Vec<_> = children.iter().map(|&c| self.display(c)).collect();
                format!("({})", operands.join(" | "))
            }
        }
    }

    fn collect_variables(&self, id: FormulaId, vars: &mut BTreeSet<VariableIdx>) {
        match self.node(id) {
            FormulaNode::Falsum | FormulaNode::Verum => {}
            FormulaNode::Literal(lit) => {
                vars.insert(lit.variable());
            }
            FormulaNode::And(children) | FormulaNode::Or(children) => {
                for child in children {
                    self.collect_variables(child, vars);
                }
            }
        }
    }

    fn intern(&self, node: FormulaNode) -> FormulaId {
        if let Some(id) = self.unique.borrow().get(&node) {
            return *id;
        }

        let id = FormulaId(u32::try_from(self.nodes.borrow().len()).expect("too many formulas"));
        self.nodes.borrow_mut().push(node.clone());
        self.unique.borrow_mut().insert(node, id);
        id
    }
}

#[cfg(test)]
mod test {
    use bitvec::prelude::*;
    use pretty_assertions::assert_eq;

    use super::{FormulaFactory, FormulaNode};
    use crate::literal::Polarity;

    #[test]
    fn constants() {
        let f = FormulaFactory::new();
        assert_eq!(f.node(f.falsum()), FormulaNode::Falsum);
        assert_eq!(f.node(f.verum()), FormulaNode::Verum);
    }

    #[test]
    fn hash_consing() {
        let f = FormulaFactory::new();
        let a = f.variable("a");
        let b = f.variable("b");

        let lit_a = f.literal(a, Polarity::Positive);
        let lit_b = f.literal(b, Polarity::Positive);

        assert_eq!(lit_a, f.literal(a, Polarity::Positive));
        assert_ne!(lit_a, f.literal(a, Polarity::Negative));
        assert_eq!(f.and(&[lit_a, lit_b]), f.and(&[lit_a, lit_b]));
    }

    #[test]
    fn and_simplifications() {
        let f = FormulaFactory::new();
        let a = f.variable("a");
        let b = f.variable("b");
        let lit_a = f.literal(a, Polarity::Positive);
        let lit_b = f.literal(b, Polarity::Positive);

        assert_eq!(f.and(&[]), f.verum());
        assert_eq!(f.and(&[lit_a]), lit_a);
        assert_eq!(f.and(&[lit_a, f.verum()]), lit_a);
        assert_eq!(f.and(&[lit_a, f.falsum()]), f.falsum());
        assert_eq!(f.and(&[lit_a, lit_a, lit_b]), f.and(&[lit_a, lit_b]));

        // Nested conjunctions are flattened.
        let nested = f.and(&[f.and(&[lit_a, lit_b]), lit_a]);
        assert_eq!(nested, f.and(&[lit_a, lit_b]));
    }

    #[test]
    fn or_simplifications() {
        let f = FormulaFactory::new();
        let a = f.variable("a");
        let b = f.variable("b");
        let lit_a = f.literal(a, Polarity::Positive);
        let lit_b = f.literal(b, Polarity::Positive);

        assert_eq!(f.or(&[]), f.falsum());
        assert_eq!(f.or(&[lit_b]), lit_b);
        assert_eq!(f.or(&[lit_a, f.falsum()]), lit_a);
        assert_eq!(f.or(&[lit_a, f.verum()]), f.verum());
        assert_eq!(f.or(&[lit_a, lit_b, lit_b]), f.or(&[lit_a, lit_b]));
    }

    #[test]
    fn evaluation() {
        let f = FormulaFactory::new();
        let a = f.variable("a");
        let b = f.variable("b");
        let lit_a = f.literal(a, Polarity::Positive);
        let not_b = f.literal(b, Polarity::Negative);

        let formula = f.or(&[f.and(&[lit_a, not_b]), f.literal(b, Polarity::Positive)]);

        assert!(!f.evaluate(formula, bits![0, 0]));
        assert!(f.evaluate(formula, bits![1, 0]));
        assert!(f.evaluate(formula, bits![0, 1]));
        assert!(f.evaluate(formula, bits![1, 1]));
    }

    #[test]
    fn variable_collection() {
        let f = FormulaFactory::new();
        let a = f.variable("a");
        let b = f.variable("b");
        let c = f.variable("c");

        assert_eq!(f.variable("a"), a);
        assert_eq!(f.variable_of(c).label(), "c");

        let formula = f.and(&[
            f.literal(a, Polarity::Positive),
            f.or(&[
                f.literal(b, Polarity::Negative),
                f.literal(a, Polarity::Negative),
            ]),
        ]);
        assert_eq!(f.variables(formula), [a, b].into_iter().collect());
        assert_eq!(f.variable_count(), 3);
    }
}
