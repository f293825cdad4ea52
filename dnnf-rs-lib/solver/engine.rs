use bitvec::slice::BitSlice;
use tracing::debug;

use crate::literal::{Polarity, VariableIdx};
use crate::solver::types::{ClauseId, Lit, Tristate};

#[derive(Debug)]
struct SolverClause {
    lits: Vec<Lit>,
}

/// Watcher entry: the clause may propagate or conflict once the watched
/// literal becomes false. The blocker is some other literal of the clause;
/// if it is already true the clause can be skipped without being touched.
#[derive(Clone, Copy, Debug)]
struct Watcher {
    clause: ClauseId,
    blocker: Lit,
}

/// Incremental SAT engine tailored to d-DNNF compilation.
///
/// The engine exposes a decide/backtrack interface instead of a `solve` loop:
/// the compiler pushes one decision per Shannon split via [`decide`], unwinds
/// it with the exactly symmetric [`undo_decide`], and consumes conflicts
/// lazily through [`at_assertion_level`]/[`assert_cd_literal`]. A conflict at
/// decision level 0 closes the engine permanently; the assertion level
/// becomes unreachable and the compilation bottoms out in falsum.
///
/// Two views of the assignment are kept in sync on every enqueue and
/// unassign: the chronological trail (for backtracking and conflict
/// analysis) and a value array (for O(1) [`value_of`] queries).
///
/// [`decide`]: DnnfSatSolver::decide
/// [`undo_decide`]: DnnfSatSolver::undo_decide
/// [`at_assertion_level`]: DnnfSatSolver::at_assertion_level
/// [`assert_cd_literal`]: DnnfSatSolver::assert_cd_literal
/// [`value_of`]: DnnfSatSolver::value_of
#[derive(Debug)]
pub struct DnnfSatSolver {
    clauses: Vec<SolverClause>,
    watches: Vec<Vec<Watcher>>,
    assigns: Vec<Tristate>,
    levels: Vec<usize>,
    reasons: Vec<Option<ClauseId>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,
    seen: Vec<bool>,

    // Conflict record: produced by conflict analysis, consumed exactly once
    // by `assert_cd_literal`. `assertion_level` is `None` when no conflict is
    // pending or the engine hit a level-0 conflict.
    last_learnt: Option<Vec<Lit>>,
    assertion_level: Option<usize>,

    newly_implied_dirty: bool,
    ok: bool,
}

impl DnnfSatSolver {
    #[must_use]
    pub fn new(num_variables: usize) -> DnnfSatSolver {
        DnnfSatSolver {
            clauses: Vec::new(),
            watches: vec![Vec::new(); 2 * num_variables],
            assigns: vec![Tristate::Undef; num_variables],
            levels: vec![0; num_variables],
            reasons: vec![None; num_variables],
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            seen: vec![false; num_variables],
            last_learnt: None,
            assertion_level: None,
            newly_implied_dirty: false,
            ok: true,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.assigns.len()
    }

    /// Permanently add a clause. Unit clauses are assigned right away;
    /// larger clauses are attached to the watcher lists.
    ///
    /// # Panics
    ///
    /// Panics when called after the first decision; added clauses are not
    /// backtrackable.
    pub fn add_clause(&mut self, literals: &[Lit]) {
        assert!(
            self.trail_lim.is_empty(),
            "clauses must be added before the first decision"
        );
        if !self.ok {
            return;
        }

        // Drop duplicate and already-false literals, skip satisfied and
        // tautological clauses.
        let mut lits: Vec<Lit> = Vec::with_capacity(literals.len());
        for &lit in literals {
            match self.value_of(lit) {
                Tristate::True => return,
                Tristate::False => continue,
                Tristate::Undef => {
                    if lits.contains(&!lit) {
                        return;
                    }
                    if !lits.contains(&lit) {
                        lits.push(lit);
                    }
                }
            }
        }

        match lits.as_slice() {
            [] => self.ok = false,
            [unit] => self.unchecked_enqueue(*unit, None),
            _ => {
                let id = ClauseId(self.clauses.len());
                self.clauses.push(SolverClause { lits });
                self.attach_clause(id);
            }
        }
    }

    /// Initial unit propagation. Returns `false` iff the added clauses are
    /// contradictory at decision level 0, which is fatal for the whole
    /// compilation.
    pub fn start(&mut self) -> bool {
        self.newly_implied_dirty = true;
        if !self.ok || self.propagate().is_some() {
            self.ok = false;
            return false;
        }
        true
    }

    /// Push a new decision level, assign the literal, propagate. Returns
    /// `false` iff propagation ran into a conflict; the conflict has then
    /// already been analyzed and recorded, and the caller must not continue
    /// down this branch without handling it.
    pub fn decide(&mut self, variable: VariableIdx, phase: bool) -> bool {
        self.newly_implied_dirty = true;
        let lit = Lit::new(variable, Polarity::from(phase));
        self.trail_lim.push(self.trail.len());
        self.unchecked_enqueue(lit, None);
        self.propagate_after_decide()
    }

    /// Backtrack to the level preceding `variable`'s decision, restoring all
    /// assignments made at or after it. Exactly symmetric with [`decide`].
    ///
    /// # Panics
    ///
    /// Panics if `variable` is not a currently assigned decision variable.
    ///
    /// [`decide`]: DnnfSatSolver::decide
    pub fn undo_decide(&mut self, variable: VariableIdx) {
        self.newly_implied_dirty = false;
        let v = variable.index();
        let level = self.levels[v];
        assert!(
            self.assigns[v] != Tristate::Undef
                && level >= 1
                && self.trail[self.trail_lim[level - 1]].variable() == variable,
            "undo_decide: variable {variable} is not a current decision"
        );
        self.cancel_until(level - 1);
    }

    /// True iff the current decision level equals the backjump level computed
    /// by the most recent conflict. Always false after a level-0 conflict.
    pub fn at_assertion_level(&self) -> bool {
        self.assertion_level == Some(self.decision_level())
    }

    /// Install the last-learnt clause and propagate its asserting literal,
    /// consuming the pending conflict record. Returns `false` iff the
    /// propagation ran into yet another conflict.
    ///
    /// # Panics
    ///
    /// Panics when called without [`at_assertion_level`] holding.
    ///
    /// [`at_assertion_level`]: DnnfSatSolver::at_assertion_level
    pub fn assert_cd_literal(&mut self) -> bool {
        assert!(
            self.at_assertion_level(),
            "assert_cd_literal called outside of the assertion level"
        );
        self.newly_implied_dirty = true;

        let learnt = self
            .last_learnt
            .take()
            .expect("a pending conflict record must accompany the assertion level");
        self.assertion_level = None;

        if learnt.len() == 1 {
            self.unchecked_enqueue(learnt[0], None);
        } else {
            let id = ClauseId(self.clauses.len());
            let asserting = learnt[0];
            self.clauses.push(SolverClause { lits: learnt });
            self.attach_clause(id);
            self.unchecked_enqueue(asserting, Some(id));
        }
        self.propagate_after_decide()
    }

    /// Value of a literal under the current partial assignment.
    pub fn value_of(&self, lit: Lit) -> Tristate {
        let value = self.assigns[lit.variable().index()];
        if lit.polarity() == Polarity::Positive {
            value
        } else {
            value.negate()
        }
    }

    /// Solver literal for a variable index, in positive phase.
    pub fn lit_for_idx(&self, variable: VariableIdx) -> Lit {
        Lit::new(variable, Polarity::Positive)
    }

    /// Variable index behind a solver literal.
    pub fn variable_index(&self, lit: Lit) -> VariableIdx {
        lit.variable()
    }

    /// Collect the literals forced strictly since the last decision whose
    /// variable is set in `known_variables`. Yields nothing unless a decision
    /// (or clause assertion) happened since the last call.
    pub fn newly_implied(&mut self, known_variables: &BitSlice, out: &mut Vec<Lit>) {
        out.clear();
        if self.newly_implied_dirty {
            let start = self.trail_lim.last().map_or(0, |&lim| lim + 1);
            for &lit in &self.trail[start..] {
                if known_variables[lit.variable().index()] {
                    out.push(lit);
                }
            }
        }
        self.newly_implied_dirty = false;
    }

    pub fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    fn attach_clause(&mut self, id: ClauseId) {
        let (first, second) = {
            let lits = &self.clauses[id.0].lits;
            (lits[0], lits[1])
        };
        self.watches[(!first).idx()].push(Watcher {
            clause: id,
            blocker: second,
        });
        self.watches[(!second).idx()].push(Watcher {
            clause: id,
            blocker: first,
        });
    }

    fn unchecked_enqueue(&mut self, lit: Lit, reason: Option<ClauseId>) {
        let v = lit.variable().index();
        debug_assert_eq!(self.assigns[v], Tristate::Undef);
        self.assigns[v] = Tristate::from(lit.polarity() == Polarity::Positive);
        self.levels[v] = self.decision_level();
        self.reasons[v] = reason;
        self.trail.push(lit);
    }

    fn propagate_after_decide(&mut self) -> bool {
        if let Some(conflict) = self.propagate() {
            self.handle_conflict(conflict);
            return false;
        }
        true
    }

    /// Two-watched-literal propagation of everything enqueued since the last
    /// call. Returns the conflicting clause, if any.
    fn propagate(&mut self) -> Option<ClauseId> {
        let mut conflict = None;

        'queue: while self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            let false_lit = !p;

            let mut watchers = std::mem::take(&mut self.watches[p.idx()]);
            let mut kept = 0;
            let mut i = 0;
            'watchers: while i < watchers.len() {
                let watcher = watchers[i];
                i += 1;

                if self.value_of(watcher.blocker) == Tristate::True {
                    watchers[kept] = watcher;
                    kept += 1;
                    continue;
                }

                let id = watcher.clause;
                {
                    let lits = &mut self.clauses[id.0].lits;
                    if lits[0] == false_lit {
                        lits.swap(0, 1);
                    }
                    debug_assert_eq!(lits[1], false_lit);
                }

                let first = self.clauses[id.0].lits[0];
                if first != watcher.blocker && self.value_of(first) == Tristate::True {
                    watchers[kept] = Watcher {
                        clause: id,
                        blocker: first,
                    };
                    kept += 1;
                    continue;
                }

                // Look for a new literal to watch.
                for k in 2..self.clauses[id.0].lits.len() {
                    let candidate = self.clauses[id.0].lits[k];
                    if self.value_of(candidate) != Tristate::False {
                        self.clauses[id.0].lits.swap(1, k);
                        self.watches[(!candidate).idx()].push(Watcher {
                            clause: id,
                            blocker: first,
                        });
                        continue 'watchers;
                    }
                }

                // Clause is unit under the assignment, or conflicting.
                watchers[kept] = Watcher {
                    clause: id,
                    blocker: first,
                };
                kept += 1;
                if self.value_of(first) == Tristate::False {
                    conflict = Some(id);
                    self.qhead = self.trail.len();
                    while i < watchers.len() {
                        watchers[kept] = watchers[i];
                        kept += 1;
                        i += 1;
                    }
                    watchers.truncate(kept);
                    self.watches[p.idx()] = watchers;
                    break 'queue;
                }
                self.unchecked_enqueue(first, Some(id));
            }
            watchers.truncate(kept);
            self.watches[p.idx()] = watchers;
        }

        conflict
    }

    fn handle_conflict(&mut self, conflict: ClauseId) {
        if self.decision_level() > 0 {
            self.analyze(conflict);
        } else {
            // Contradiction at level 0: the engine is permanently closed,
            // the assertion level becomes unreachable.
            debug!("conflict at decision level 0, closing the engine");
            self.cancel_until(0);
            self.last_learnt = None;
            self.assertion_level = None;
            self.ok = false;
        }
    }

    /// First-UIP conflict analysis. Records the learnt clause (asserting
    /// literal first) together with its assertion level.
    fn analyze(&mut self, conflict: ClauseId) {
        let current_level = self.decision_level();
        let mut rest: Vec<Lit> = Vec::new();
        let mut path_count = 0usize;
        let mut p: Option<Lit> = None;
        let mut confl = conflict;
        let mut index = self.trail.len();

        loop {
            let skip = usize::from(p.is_some());
            for k in skip..self.clauses[confl.0].lits.len() {
                let q = self.clauses[confl.0].lits[k];
                let v = q.variable().index();
                if !self.seen[v] && self.levels[v] > 0 {
                    self.seen[v] = true;
                    if self.levels[v] >= current_level {
                        path_count += 1;
                    } else {
                        rest.push(q);
                    }
                }
            }

            // Walk the trail backwards to the next marked literal.
            loop {
                index -= 1;
                if self.seen[self.trail[index].variable().index()] {
                    break;
                }
            }
            let pivot = self.trail[index];
            self.seen[pivot.variable().index()] = false;
            p = Some(pivot);
            path_count -= 1;
            if path_count == 0 {
                break;
            }
            confl = self.reasons[pivot.variable().index()]
                .expect("every non-decision literal on the conflict path has a reason");
        }

        let asserting = !p.expect("conflict analysis visits at least one literal");
        let mut learnt = Vec::with_capacity(rest.len() + 1);
        learnt.push(asserting);
        learnt.extend(rest);

        let assertion_level = if learnt.len() == 1 {
            0
        } else {
            // Move the literal with the highest level to the second slot so
            // it is watched once the clause is installed.
            let mut max_i = 1;
            for k in 2..learnt.len() {
                if self.levels[learnt[k].variable().index()]
                    > self.levels[learnt[max_i].variable().index()]
                {
                    max_i = k;
                }
            }
            learnt.swap(1, max_i);
            self.levels[learnt[1].variable().index()]
        };

        for &lit in &learnt {
            self.seen[lit.variable().index()] = false;
        }

        self.last_learnt = Some(learnt);
        self.assertion_level = Some(assertion_level);
    }

    fn cancel_until(&mut self, level: usize) {
        if self.decision_level() > level {
            let lim = self.trail_lim[level];
            for c in (lim..self.trail.len()).rev() {
                let v = self.trail[c].variable().index();
                self.assigns[v] = Tristate::Undef;
                self.reasons[v] = None;
            }
            self.trail.truncate(lim);
            self.trail_lim.truncate(level);
            self.qhead = lim;
        }
    }
}

#[cfg(test)]
mod test {
    use bitvec::prelude::*;
    use pretty_assertions::assert_eq;

    use super::DnnfSatSolver;
    use crate::literal::{Polarity, VariableIdx};
    use crate::solver::types::{Lit, Tristate};

    fn pos(var: u32) -> Lit {
        Lit::new(VariableIdx(var), Polarity::Positive)
    }

    fn neg(var: u32) -> Lit {
        Lit::new(VariableIdx(var), Polarity::Negative)
    }

    #[test]
    fn start_propagates_units() {
        let mut solver = DnnfSatSolver::new(3);
        solver.add_clause(&[pos(0)]);
        solver.add_clause(&[neg(0), pos(1)]);
        solver.add_clause(&[neg(1), pos(2)]);

        assert!(solver.start());
        assert_eq!(solver.value_of(pos(0)), Tristate::True);
        assert_eq!(solver.value_of(pos(1)), Tristate::True);
        assert_eq!(solver.value_of(pos(2)), Tristate::True);
        assert_eq!(solver.decision_level(), 0);
    }

    #[test]
    fn contradictory_units_close_the_engine() {
        let mut solver = DnnfSatSolver::new(1);
        solver.add_clause(&[pos(0)]);
        solver.add_clause(&[neg(0)]);
        assert!(!solver.start());
        assert!(!solver.at_assertion_level());
    }

    #[test]
    fn level_zero_conflict_through_propagation() {
        let mut solver = DnnfSatSolver::new(2);
        solver.add_clause(&[pos(0)]);
        solver.add_clause(&[neg(0), pos(1)]);
        solver.add_clause(&[neg(0), neg(1)]);
        assert!(!solver.start());
        assert!(!solver.at_assertion_level());
    }

    #[test]
    fn decide_and_undo_are_symmetric() {
        let mut solver = DnnfSatSolver::new(4);
        solver.add_clause(&[neg(0), pos(1)]);
        solver.add_clause(&[neg(1), pos(2), pos(3)]);
        assert!(solver.start());

        let assigns = solver.assigns.clone();
        let trail = solver.trail.clone();
        let trail_lim = solver.trail_lim.clone();
        let qhead = solver.qhead;

        assert!(solver.decide(VariableIdx(0), true));
        assert_eq!(solver.value_of(pos(1)), Tristate::True);
        solver.undo_decide(VariableIdx(0));

        assert_eq!(solver.assigns, assigns);
        assert_eq!(solver.trail, trail);
        assert_eq!(solver.trail_lim, trail_lim);
        assert_eq!(solver.qhead, qhead);
    }

    #[test]
    fn undo_decide_unwinds_nested_decisions() {
        let mut solver = DnnfSatSolver::new(3);
        solver.add_clause(&[neg(0), pos(1), pos(2)]);
        assert!(solver.start());

        assert!(solver.decide(VariableIdx(0), true));
        assert!(solver.decide(VariableIdx(1), false));
        assert_eq!(solver.decision_level(), 2);

        // Undoing the outer decision drops the inner one as well.
        solver.undo_decide(VariableIdx(0));
        assert_eq!(solver.decision_level(), 0);
        assert_eq!(solver.value_of(pos(1)), Tristate::Undef);
    }

    #[test]
    fn conflict_records_learnt_clause_and_assertion_level() {
        // Deciding 0 and 1 makes clauses (¬0 ∨ ¬1 ∨ 2) and (¬0 ∨ ¬1 ∨ ¬2)
        // clash on variable 2.
        let mut solver = DnnfSatSolver::new(3);
        solver.add_clause(&[neg(0), neg(1), pos(2)]);
        solver.add_clause(&[neg(0), neg(1), neg(2)]);
        assert!(solver.start());

        assert!(solver.decide(VariableIdx(0), true));
        assert!(!solver.decide(VariableIdx(1), true));
        assert!(!solver.at_assertion_level());

        solver.undo_decide(VariableIdx(1));
        assert!(solver.at_assertion_level());
        assert!(solver.assert_cd_literal());

        // The learnt clause forces ¬1 while 0 still holds.
        assert_eq!(solver.value_of(pos(1)), Tristate::False);
        assert_eq!(solver.value_of(pos(0)), Tristate::True);
    }

    #[test]
    fn newly_implied_dirty_discipline() {
        let mut solver = DnnfSatSolver::new(3);
        solver.add_clause(&[pos(0)]);
        solver.add_clause(&[neg(1), pos(2)]);
        assert!(solver.start());

        let known = bitvec![1; 3];
        let mut implied = Vec::new();

        solver.newly_implied(&known, &mut implied);
        assert_eq!(implied, vec![pos(0)]);

        // No decision since the last call: nothing is reported.
        solver.newly_implied(&known, &mut implied);
        assert!(implied.is_empty());

        assert!(solver.decide(VariableIdx(1), true));
        solver.newly_implied(&known, &mut implied);
        assert_eq!(implied, vec![pos(2)]);
    }

    #[test]
    fn newly_implied_filters_unknown_variables() {
        let mut solver = DnnfSatSolver::new(3);
        solver.add_clause(&[neg(0), pos(1)]);
        solver.add_clause(&[neg(0), pos(2)]);
        assert!(solver.start());

        assert!(solver.decide(VariableIdx(0), true));
        let mut known = bitvec![0; 3];
        known.set(2, true);

        let mut implied = Vec::new();
        solver.newly_implied(&known, &mut implied);
        assert_eq!(implied, vec![pos(2)]);
    }

    #[test]
    #[should_panic(expected = "not a current decision")]
    fn undo_decide_requires_a_decision() {
        let mut solver = DnnfSatSolver::new(2);
        solver.add_clause(&[pos(0)]);
        assert!(solver.start());
        // Variable 0 is implied at level 0, not decided.
        solver.undo_decide(VariableIdx(0));
    }

    #[test]
    #[should_panic(expected = "outside of the assertion level")]
    fn assert_cd_literal_requires_assertion_level() {
        let mut solver = DnnfSatSolver::new(2);
        solver.add_clause(&[pos(0), pos(1)]);
        assert!(solver.start());
        solver.assert_cd_literal();
    }
}
