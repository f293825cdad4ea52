use bitvec::prelude::*;

use crate::solver::{DnnfSatSolver, Lit, Tristate};

/// Node of a binary decomposition tree: either a single clause or the
/// composition of two subtrees.
#[derive(Debug)]
pub enum DTree {
    Leaf(DTreeLeaf),
    Internal(Box<DTreeInternal>),
}

/// Leaf holding one non-unit clause of the CNF.
#[derive(Debug)]
pub struct DTreeLeaf {
    /// Clause id inside the d-tree, used in cache keys.
    id: usize,
    literals: Vec<Lit>,
    var_set: BitVec,
}

/// Internal node composing two subtrees. All fields besides the children are
/// derived once by [`DTree::initialize`].
#[derive(Debug)]
pub struct DTreeInternal {
    left: DTree,
    right: DTree,

    depth: usize,
    size: usize,
    var_set: BitVec,
    widest_separator: usize,

    // Snapshots of the clause contents of each child's subtree, walked when
    // recomputing the dynamic separator under the current assignment.
    left_contents: Vec<Vec<Lit>>,
    right_contents: Vec<Vec<Lit>>,
}

impl DTreeLeaf {
    pub(crate) fn new(id: usize, literals: Vec<Lit>) -> DTreeLeaf {
        DTreeLeaf {
            id,
            literals,
            var_set: BitVec::new(),
        }
    }

    pub(crate) fn literals(&self) -> &[Lit] {
        &self.literals
    }

    /// A clause is subsumed once any of its literals holds under the current
    /// assignment.
    fn is_subsumed(&self, solver: &DnnfSatSolver) -> bool {
        self.literals
            .iter()
            .any(|&lit| solver.value_of(lit) == Tristate::True)
    }
}

impl DTreeInternal {
    pub(crate) fn left(&self) -> &DTree {
        &self.left
    }

    pub(crate) fn right(&self) -> &DTree {
        &self.right
    }
}

impl DTree {
    pub(crate) fn internal(left: DTree, right: DTree) -> DTree {
        DTree::Internal(Box::new(DTreeInternal {
            left,
            right,
            depth: 0,
            size: 0,
            var_set: BitVec::new(),
            widest_separator: 0,
            left_contents: Vec::new(),
            right_contents: Vec::new(),
        }))
    }

    /// Bind the tree to the solver's variable indexing and derive the static
    /// data: variable sets, depths, sizes, clause-content snapshots, and the
    /// widest separator of the whole tree. Called exactly once before
    /// compilation.
    pub fn initialize(&mut self, solver: &DnnfSatSolver) {
        let num_variables = solver.num_variables();
        match self {
            DTree::Leaf(leaf) => {
                leaf.var_set = bitvec![0; num_variables];
                for lit in &leaf.literals {
                    leaf.var_set.set(lit.variable().index(), true);
                }
            }
            DTree::Internal(node) => {
                node.left.initialize(solver);
                node.right.initialize(solver);

                node.var_set = node.left.static_var_set().to_bitvec();
                node.var_set |= node.right.static_var_set();

                let mut separator = node.left.static_var_set().to_bitvec();
                separator &= node.right.static_var_set();

                node.depth = 1 + node.left.depth().max(node.right.depth());
                node.size = node.left.size() + node.right.size();
                node.left_contents = node.left.clause_contents();
                node.right_contents = node.right.clause_contents();
                node.widest_separator = separator
                    .count_ones()
                    .max(node.left.widest_separator())
                    .max(node.right.widest_separator());
            }
        }
    }

    /// All variables in the subtree, independent of the assignment.
    pub fn static_var_set(&self) -> &BitSlice {
        match self {
            DTree::Leaf(leaf) => &leaf.var_set,
            DTree::Internal(node) => &node.var_set,
        }
    }

    /// Variables currently shared by both children: unassigned variables of
    /// unsubsumed clauses occurring on both sides. Recomputed per call, since
    /// it shrinks as the assignment grows. Empty for leaves.
    pub fn dynamic_separator(&self, solver: &DnnfSatSolver) -> BitVec {
        match self {
            DTree::Leaf(_) => BitVec::new(),
            DTree::Internal(node) => {
                let mut left_vars = bitvec![0; node.var_set.len()];
                let mut right_vars = bitvec![0; node.var_set.len()];
                Self::unassigned_vars(&node.left_contents, solver, &mut left_vars);
                Self::unassigned_vars(&node.right_contents, solver, &mut right_vars);
                left_vars &= &right_vars;
                left_vars
            }
        }
    }

    /// Mark the cache-key bits of the subtree: the id of every unsubsumed
    /// clause (offset past the variable range) plus its still-unassigned
    /// variables. Two equal keys denote the same remaining subproblem.
    pub fn cache_key(&self, key: &mut BitSlice, num_variables: usize, solver: &DnnfSatSolver) {
        match self {
            DTree::Leaf(leaf) => {
                if !leaf.is_subsumed(solver) {
                    key.set(num_variables + 1 + leaf.id, true);
                    for &lit in &leaf.literals {
                        if solver.value_of(lit) == Tristate::Undef {
                            key.set(lit.variable().index(), true);
                        }
                    }
                }
            }
            DTree::Internal(node) => {
                node.left.cache_key(key, num_variables, solver);
                node.right.cache_key(key, num_variables, solver);
            }
        }
    }

    /// Count, per variable, in how many not-yet-subsumed clauses of the
    /// subtree it occurs. Entries holding `-1` are out of scope and stay
    /// untouched.
    pub fn count_unsubsumed_occurrences(&self, occurrences: &mut [i32], solver: &DnnfSatSolver) {
        match self {
            DTree::Leaf(leaf) => {
                if !leaf.is_subsumed(solver) {
                    for lit in &leaf.literals {
                        let occ = occurrences[lit.variable().index()];
                        if occ != -1 {
                            occurrences[lit.variable().index()] = occ + 1;
                        }
                    }
                }
            }
            DTree::Internal(node) => {
                node.left.count_unsubsumed_occurrences(occurrences, solver);
                node.right.count_unsubsumed_occurrences(occurrences, solver);
            }
        }
    }

    /// Distance to the deepest leaf; leaves are at depth 0.
    pub fn depth(&self) -> usize {
        match self {
            DTree::Leaf(_) => 0,
            DTree::Internal(node) => node.depth,
        }
    }

    /// Number of clauses in the subtree.
    pub fn size(&self) -> usize {
        match self {
            DTree::Leaf(_) => 1,
            DTree::Internal(node) => node.size,
        }
    }

    /// Largest static separator anywhere in the subtree, an upper bound for
    /// the number of case splits on any node.
    pub fn widest_separator(&self) -> usize {
        match self {
            DTree::Leaf(_) => 0,
            DTree::Internal(node) => node.widest_separator,
        }
    }

    fn clause_contents(&self) -> Vec<Vec<Lit>> {
        match self {
            DTree::Leaf(leaf) => vec![leaf.literals.clone()],
            DTree::Internal(node) => {
                let mut contents = node.left_contents.clone();
                contents.extend(node.right_contents.iter().cloned());
                contents
            }
        }
    }

    fn unassigned_vars(contents: &[Vec<Lit>], solver: &DnnfSatSolver, vars: &mut BitVec) {
        for clause in contents {
            let subsumed = clause
                .iter()
                .any(|&lit| solver.value_of(lit) == Tristate::True);
            if subsumed {
                continue;
            }
            for &lit in clause {
                if solver.value_of(lit) == Tristate::Undef {
                    vars.set(lit.variable().index(), true);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use bitvec::prelude::*;
    use pretty_assertions::assert_eq;

    use super::{DTree, DTreeLeaf};
    use crate::literal::{Polarity, VariableIdx};
    use crate::solver::{DnnfSatSolver, Lit};

    fn pos(var: u32) -> Lit {
        Lit::new(VariableIdx(var), Polarity::Positive)
    }

    fn neg(var: u32) -> Lit {
        Lit::new(VariableIdx(var), Polarity::Negative)
    }

    fn two_clause_tree() -> (DTree, DnnfSatSolver) {
        // (0 ∨ 1) and (¬0 ∨ 2), sharing variable 0.
        let left = DTree::Leaf(DTreeLeaf::new(0, vec![pos(0), pos(1)]));
        let right = DTree::Leaf(DTreeLeaf::new(1, vec![neg(0), pos(2)]));
        let mut tree = DTree::internal(left, right);

        let mut solver = DnnfSatSolver::new(3);
        solver.add_clause(&[pos(0), pos(1)]);
        solver.add_clause(&[neg(0), pos(2)]);
        assert!(solver.start());

        tree.initialize(&solver);
        (tree, solver)
    }

    #[test]
    fn static_data() {
        let (tree, _) = two_clause_tree();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.size(), 2);
        assert_eq!(tree.widest_separator(), 1);
        assert_eq!(tree.static_var_set(), bits![1, 1, 1]);
    }

    #[test]
    fn dynamic_separator_shrinks_with_assignments() {
        let (tree, mut solver) = two_clause_tree();
        assert_eq!(tree.dynamic_separator(&solver), bitvec![1, 0, 0]);

        // Assigning the shared variable dissolves the separator.
        assert!(solver.decide(VariableIdx(0), true));
        assert!(tree.dynamic_separator(&solver).not_any());
        solver.undo_decide(VariableIdx(0));
        assert_eq!(tree.dynamic_separator(&solver), bitvec![1, 0, 0]);
    }

    #[test]
    fn occurrence_counts_skip_subsumed_clauses() {
        let (tree, mut solver) = two_clause_tree();

        let mut occurrences = vec![0; 3];
        tree.count_unsubsumed_occurrences(&mut occurrences, &solver);
        assert_eq!(occurrences, vec![2, 1, 1]);

        // Deciding 0 subsumes (0 ∨ 1) and forces 2, subsuming (¬0 ∨ 2).
        assert!(solver.decide(VariableIdx(0), true));
        let mut occurrences = vec![0; 3];
        tree.count_unsubsumed_occurrences(&mut occurrences, &solver);
        assert_eq!(occurrences, vec![0, 0, 0]);
    }

    #[test]
    fn cache_key_reflects_assignment() {
        let (tree, mut solver) = two_clause_tree();
        let num_variables = 3;

        let mut before = bitvec![0; num_variables + 1 + 2];
        tree.cache_key(&mut before, num_variables, &solver);
        // Both clauses unsubsumed, all three variables open.
        assert_eq!(before.count_ones(), 5);

        assert!(solver.decide(VariableIdx(1), true));
        let mut after = bitvec![0; num_variables + 1 + 2];
        tree.cache_key(&mut after, num_variables, &solver);
        // (0 ∨ 1) is subsumed; only (¬0 ∨ 2) and its variables remain.
        assert!(after.count_ones() < before.count_ones());
        assert!(after[num_variables + 1 + 1]);
        assert!(!after[num_variables + 1]);
    }
}
