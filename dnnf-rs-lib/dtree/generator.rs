use bitvec::prelude::*;
use tracing::debug;

use crate::compiler::options::DTreeStrategy;
use crate::dtree::dtree::{DTree, DTreeLeaf};
use crate::formula::Cnf;
use crate::solver::Lit;

/// Build a d-tree over the non-unit clauses of `cnf`, or `None` when there
/// are no non-unit clauses to decompose.
pub(crate) fn generate(cnf: &Cnf, strategy: DTreeStrategy) -> Option<DTree> {
    if cnf.non_units().is_empty() {
        return None;
    }

    let leaves: Vec<Working> = cnf
        .non_units()
        .iter()
        .enumerate()
        .map(|(id, clause)| {
            let literals: Vec<Lit> = clause.literals().iter().map(|&lit| Lit::from(lit)).collect();
            let mut var_set = bitvec![0; cnf.num_variables()];
            for lit in &literals {
                var_set.set(lit.variable().index(), true);
            }
            Working {
                tree: DTree::Leaf(DTreeLeaf::new(id, literals)),
                var_set,
            }
        })
        .collect();

    let tree = match strategy {
        DTreeStrategy::Balanced => compose_balanced(leaves).tree,
        DTreeStrategy::MinFill => min_fill(cnf, leaves),
    };

    debug!(
        clauses = cnf.non_units().len(),
        ?strategy,
        "generated d-tree"
    );
    Some(tree)
}

/// A subtree under construction together with the variables it mentions.
struct Working {
    tree: DTree,
    var_set: BitVec,
}

/// Pair subtrees level by level until a single tree remains; an odd tree is
/// carried over to the next round.
fn compose_balanced(mut trees: Vec<Working>) -> Working {
    assert!(!trees.is_empty());

    while trees.len() > 1 {
        let mut parents = Vec::with_capacity(trees.len() / 2 + 1);
        let mut iter = trees.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => parents.push(compose(left, right)),
                None => parents.push(left),
            }
        }
        trees = parents;
    }

    trees.pop().expect("exactly one tree remains")
}

fn compose(left: Working, right: Working) -> Working {
    let mut var_set = left.var_set;
    var_set |= &right.var_set;
    Working {
        tree: DTree::internal(left.tree, right.tree),
        var_set,
    }
}

/// Min-fill construction: eliminate variables of the clause interaction
/// graph in an order that adds as few fill-in edges as possible, composing
/// all subtrees mentioning the eliminated variable along the way. Ties are
/// broken towards the smallest variable index, so the result is
/// deterministic.
fn min_fill(cnf: &Cnf, leaves: Vec<Working>) -> DTree {
    let order = min_fill_order(cnf);

    let mut sigma = leaves;
    for var in order {
        let (gamma, rest): (Vec<Working>, Vec<Working>) =
            sigma.into_iter().partition(|w| w.var_set[var]);
        sigma = rest;
        if !gamma.is_empty() {
            sigma.push(compose_balanced(gamma));
        }
    }

    compose_balanced(sigma).tree
}

/// Min-fill elimination order over the interaction graph of the non-unit
/// clauses: every clause induces a clique over its variables.
fn min_fill_order(cnf: &Cnf) -> Vec<usize> {
    let num_variables = cnf.num_variables();
    let mut adjacency = vec![bitvec![0; num_variables]; num_variables];
    let mut remaining = bitvec![0; num_variables];

    for clause in cnf.non_units() {
        let vars: Vec<usize> = clause
            .literals()
            .iter()
            .map(|lit| lit.variable().index())
            .collect();
        for (i, &u) in vars.iter().enumerate() {
            remaining.set(u, true);
            for &v in &vars[i + 1..] {
                if u != v {
                    adjacency[u].set(v, true);
                    adjacency[v].set(u, true);
                }
            }
        }
    }

    let mut order = Vec::with_capacity(remaining.count_ones());
    while remaining.any() {
        let mut best = usize::MAX;
        let mut best_fill = usize::MAX;
        for v in remaining.iter_ones() {
            let fill = fill_in_edges(&adjacency, &remaining, v);
            if fill < best_fill {
                best = v;
                best_fill = fill;
            }
        }

        // Connect the neighborhood of the eliminated vertex.
        let neighbors: Vec<usize> = adjacency[best]
            .iter_ones()
            .filter(|&u| remaining[u])
            .collect();
        for (i, &u) in neighbors.iter().enumerate() {
            for &w in &neighbors[i + 1..] {
                adjacency[u].set(w, true);
                adjacency[w].set(u, true);
            }
        }

        remaining.set(best, false);
        order.push(best);
    }

    order
}

/// Number of edges eliminating `v` would add between its still-remaining
/// neighbors.
fn fill_in_edges(adjacency: &[BitVec], remaining: &BitSlice, v: usize) -> usize {
    let neighbors: Vec<usize> = adjacency[v].iter_ones().filter(|&u| remaining[u]).collect();

    let mut fill = 0;
    for (i, &u) in neighbors.iter().enumerate() {
        for &w in &neighbors[i + 1..] {
            if !adjacency[u][w] {
                fill += 1;
            }
        }
    }
    fill
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::generate;
    use crate::compiler::options::DTreeStrategy;
    use crate::formula::{Clause, Cnf};
    use crate::literal::{Literal, Polarity, VariableIdx};
    use crate::solver::DnnfSatSolver;

    fn lit(var: u32, polarity: Polarity) -> Literal {
        Literal::new(VariableIdx(var), polarity)
    }

    fn chain_cnf(len: u32) -> Cnf {
        // (x0 ∨ x1), (¬x1 ∨ x2), (¬x2 ∨ x3), ...
        let mut clauses = vec![Clause::new(vec![
            lit(0, Polarity::Positive),
            lit(1, Polarity::Positive),
        ])];
        for v in 1..len {
            clauses.push(Clause::new(vec![
                lit(v, Polarity::Negative),
                lit(v + 1, Polarity::Positive),
            ]));
        }
        Cnf::new(clauses)
    }

    #[test]
    fn no_tree_without_non_unit_clauses() {
        let cnf = Cnf::new(vec![Clause::new(vec![lit(0, Polarity::Positive)])]);
        assert!(generate(&cnf, DTreeStrategy::MinFill).is_none());
        assert!(generate(&cnf, DTreeStrategy::Balanced).is_none());
    }

    #[test]
    fn trees_cover_all_clauses() {
        let cnf = chain_cnf(4);
        for strategy in [DTreeStrategy::MinFill, DTreeStrategy::Balanced] {
            let mut tree = generate(&cnf, strategy).unwrap();
            let solver = DnnfSatSolver::new(cnf.num_variables());
            tree.initialize(&solver);

            assert_eq!(tree.size(), cnf.non_units().len());
            assert_eq!(tree.static_var_set().count_ones(), cnf.num_variables());
        }
    }

    #[test]
    fn min_fill_is_deterministic() {
        let cnf = chain_cnf(5);
        let mut fst = generate(&cnf, DTreeStrategy::MinFill).unwrap();
        let mut snd = generate(&cnf, DTreeStrategy::MinFill).unwrap();

        let solver = DnnfSatSolver::new(cnf.num_variables());
        fst.initialize(&solver);
        snd.initialize(&solver);

        assert_eq!(fst.depth(), snd.depth());
        assert_eq!(fst.widest_separator(), snd.widest_separator());
        assert_eq!(format!("{fst:?}"), format!("{snd:?}"));
    }
}
