use bitvec::prelude::*;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::compiler::dnnf::Dnnf;
use crate::compiler::handler::{CancelEvent, Canceled, CompilationHandler};
use crate::compiler::options::CompilerOptions;
use crate::dtree::{generator, DTree, DTreeInternal, DTreeLeaf};
use crate::formula::{Cnf, FormulaFactory, FormulaId};
use crate::literal::{Polarity, VariableIdx};
use crate::solver::{DnnfSatSolver, Lit, Tristate};

/// Compile `cnf` into d-DNNF.
///
/// The returned formula lives in `f` and is equivalent to the conjunction of
/// the CNF's clauses; every conjunction in it is decomposable and every
/// disjunction deterministic. An unsatisfiable input compiles to falsum.
/// `handler` is consulted at the start and before every case split and may
/// cancel the compilation.
pub fn compile(
    f: &FormulaFactory,
    cnf: &Cnf,
    options: &CompilerOptions,
    handler: &mut dyn CompilationHandler,
) -> Result<Dnnf, Canceled> {
    if !handler.compilation_started() {
        return Err(Canceled {
            event: CancelEvent::CompilationStarted,
        });
    }

    let variables = cnf.variables().clone();
    let unit_formulas: Vec<FormulaId> = cnf
        .units()
        .iter()
        .map(|lit| f.literal(lit.variable(), lit.polarity()))
        .collect();

    let mut solver = DnnfSatSolver::new(cnf.num_variables());
    for &unit in cnf.units() {
        solver.add_clause(&[Lit::from(unit)]);
    }
    for clause in cnf.non_units() {
        let lits: Vec<Lit> = clause.literals().iter().map(|&lit| Lit::from(lit)).collect();
        solver.add_clause(&lits);
    }
    if !solver.start() {
        return Ok(Dnnf::new(variables, f.falsum()));
    }

    let Some(mut dtree) = generator::generate(cnf, options.dtree_strategy) else {
        // Units only; propagation already proved them consistent.
        return Ok(Dnnf::new(variables, f.and(&unit_formulas)));
    };
    dtree.initialize(&solver);

    debug!(
        clauses = dtree.size(),
        depth = dtree.depth(),
        widest_separator = dtree.widest_separator(),
        "compiling CNF to d-DNNF"
    );

    let mut compiler = DnnfCompiler::new(f, handler, solver, cnf, &dtree);
    let ddnnf = compiler.cnf2ddnnf(&dtree)?;

    let formula = if ddnnf == f.falsum() {
        f.falsum()
    } else {
        let mut operands = unit_formulas;
        operands.push(ddnnf);
        f.and(&operands)
    };
    Ok(Dnnf::new(variables, formula))
}

/// State of one compilation run. The solver tracks the current partial
/// assignment, the cache maps residual subproblems (as bitset fingerprints)
/// to already-compiled nodes, and the scratch buffers are preallocated per
/// (d-tree depth, splits-on-this-node) slot so recursion never allocates
/// them.
struct DnnfCompiler<'a> {
    f: &'a FormulaFactory,
    handler: &'a mut dyn CompilationHandler,
    solver: DnnfSatSolver,
    num_variables: usize,

    cache: FxHashMap<BitVec, FormulaId>,
    local_cache_keys: Vec<Vec<BitVec>>,
    local_occurrences: Vec<Vec<Vec<i32>>>,
    implied: Vec<Lit>,
}

impl<'a> DnnfCompiler<'a> {
    fn new(
        f: &'a FormulaFactory,
        handler: &'a mut dyn CompilationHandler,
        solver: DnnfSatSolver,
        cnf: &Cnf,
        dtree: &DTree,
    ) -> DnnfCompiler<'a> {
        let num_variables = cnf.num_variables();
        let key_len = num_variables + 1 + cnf.non_units().len();
        let depth = dtree.depth();
        let widest = dtree.widest_separator();

        DnnfCompiler {
            f,
            handler,
            solver,
            num_variables,
            cache: FxHashMap::default(),
            local_cache_keys: vec![vec![bitvec![0; key_len]; widest + 1]; depth + 1],
            local_occurrences: vec![vec![vec![0; num_variables]; widest + 1]; depth + 1],
            implied: Vec::new(),
        }
    }

    fn cnf2ddnnf(&mut self, tree: &DTree) -> Result<FormulaId, Canceled> {
        self.cnf2ddnnf_split(tree, 0)
    }

    /// Shannon-expand on separator variables of `tree` until the separator
    /// dissolves, then recurse into the children independently. A falsum
    /// branch whose conflict asserts a literal at this very level restarts
    /// the node from scratch under the strengthened assignment.
    fn cnf2ddnnf_split(&mut self, tree: &DTree, mut splits: usize) -> Result<FormulaId, Canceled> {
        loop {
            let separator = tree.dynamic_separator(&self.solver);
            let implied = self.newly_implied_literals(tree.static_var_set());

            if separator.not_any() {
                return match tree {
                    DTree::Leaf(leaf) => {
                        let clause = self.leaf2ddnnf(leaf);
                        Ok(self.f.and(&[implied, clause]))
                    }
                    DTree::Internal(node) => self.conjoin(implied, node, splits),
                };
            }

            let variable = self.choose_shannon_variable(tree, &separator, splits);
            if !self.handler.shannon_expansion() {
                return Err(Canceled {
                    event: CancelEvent::ShannonExpansion,
                });
            }

            let mut positive = self.f.falsum();
            if self.solver.decide(variable, true) {
                positive = self.cnf2ddnnf_split(tree, splits + 1)?;
            }
            self.solver.undo_decide(variable);
            if positive == self.f.falsum() {
                if self.solver.at_assertion_level() && self.solver.assert_cd_literal() {
                    splits = 0;
                    continue;
                }
                return Ok(self.f.falsum());
            }

            let mut negative = self.f.falsum();
            if self.solver.decide(variable, false) {
                negative = self.cnf2ddnnf_split(tree, splits + 1)?;
            }
            self.solver.undo_decide(variable);
            if negative == self.f.falsum() {
                if self.solver.at_assertion_level() && self.solver.assert_cd_literal() {
                    splits = 0;
                    continue;
                }
                return Ok(self.f.falsum());
            }

            let lit = self.f.literal(variable, Polarity::Positive);
            let negated = self.f.literal(variable, Polarity::Negative);
            let positive_branch = self.f.and(&[lit, positive]);
            let negative_branch = self.f.and(&[negated, negative]);
            let shannon = self.f.or(&[positive_branch, negative_branch]);
            return Ok(self.f.and(&[implied, shannon]));
        }
    }

    /// Once the separator is empty the children share no open variables, so
    /// their compilations are independent and the conjunction decomposable.
    fn conjoin(
        &mut self,
        implied: FormulaId,
        node: &DTreeInternal,
        splits: usize,
    ) -> Result<FormulaId, Canceled> {
        if implied == self.f.falsum() {
            return Ok(self.f.falsum());
        }
        let left = self.cnf_aux(node.left(), splits)?;
        if left == self.f.falsum() {
            return Ok(self.f.falsum());
        }
        let right = self.cnf_aux(node.right(), splits)?;
        if right == self.f.falsum() {
            return Ok(self.f.falsum());
        }
        Ok(self.f.and(&[implied, left, right]))
    }

    /// Compile a child subtree, going through the cache for internal nodes.
    /// Falsum is never cached: a conflict may strengthen the solver state
    /// mid-node, making an earlier falsum stale for the same fingerprint.
    fn cnf_aux(&mut self, tree: &DTree, splits: usize) -> Result<FormulaId, Canceled> {
        if let DTree::Leaf(leaf) = tree {
            return Ok(self.leaf2ddnnf(leaf));
        }

        let depth = tree.depth();
        {
            let key = &mut self.local_cache_keys[depth][splits];
            key.fill(false);
            tree.cache_key(key, self.num_variables, &self.solver);
        }
        if let Some(&cached) = self.cache.get(&self.local_cache_keys[depth][splits]) {
            return Ok(cached);
        }

        let dnnf = self.cnf2ddnnf(tree)?;
        if dnnf != self.f.falsum() {
            let key = self.local_cache_keys[depth][splits].clone();
            self.cache.insert(key, dnnf);
        }
        Ok(dnnf)
    }

    /// Pick the separator variable occurring in the most not-yet-subsumed
    /// clauses of the subtree; ties go to the smallest index.
    fn choose_shannon_variable(
        &mut self,
        tree: &DTree,
        separator: &BitSlice,
        splits: usize,
    ) -> VariableIdx {
        let occurrences = &mut self.local_occurrences[tree.depth()][splits];
        for (var, occ) in occurrences.iter_mut().enumerate() {
            *occ = if separator[var] { 0 } else { -1 };
        }
        tree.count_unsubsumed_occurrences(occurrences, &self.solver);

        let mut best = 0;
        let mut best_occ = -1;
        for var in separator.iter_ones() {
            if occurrences[var] > best_occ {
                best = var;
                best_occ = occurrences[var];
            }
        }
        assert!(best_occ >= 0, "separator variable must occur somewhere");
        VariableIdx::from(best)
    }

    /// Compile a single clause under the current assignment: verum when
    /// already satisfied, otherwise an OR over its open literals made
    /// deterministic by conjoining each disjunct with the negations of its
    /// predecessors.
    fn leaf2ddnnf(&self, leaf: &DTreeLeaf) -> FormulaId {
        let mut clause = self.f.falsum();
        let mut current = self.f.verum();
        for &lit in leaf.literals() {
            match self.solver.value_of(lit) {
                Tristate::True => return self.f.verum(),
                Tristate::False => {}
                Tristate::Undef => {
                    let open = self.f.literal(lit.variable(), lit.polarity());
                    let disjunct = self.f.and(&[current, open]);
                    clause = self.f.or(&[clause, disjunct]);
                    let negated = self.f.literal(lit.variable(), !lit.polarity());
                    current = self.f.and(&[current, negated]);
                }
            }
        }
        clause
    }

    /// Conjunction of the literals forced since the last decision, restricted
    /// to the subtree's variables. Everything outside the subtree is handled
    /// where it belongs, keeping the result decomposable.
    fn newly_implied_literals(&mut self, known_variables: &BitSlice) -> FormulaId {
        let mut implied = std::mem::take(&mut self.implied);
        self.solver.newly_implied(known_variables, &mut implied);
        let operands: Vec<FormulaId> = implied
            .iter()
            .map(|&lit| self.f.literal(lit.variable(), lit.polarity()))
            .collect();
        self.implied = implied;
        self.f.and(&operands)
    }
}
