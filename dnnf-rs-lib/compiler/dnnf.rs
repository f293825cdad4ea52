use std::collections::BTreeSet;

use crate::formula::FormulaId;
use crate::literal::VariableIdx;

/// Result of a successful compilation: the original variable set of the
/// input CNF together with the compiled formula in d-DNNF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dnnf {
    variables: BTreeSet<VariableIdx>,
    formula: FormulaId,
}

impl Dnnf {
    pub(crate) fn new(variables: BTreeSet<VariableIdx>, formula: FormulaId) -> Dnnf {
        Dnnf { variables, formula }
    }

    /// The compiled formula. Falsum iff the input CNF is unsatisfiable.
    pub fn formula(&self) -> FormulaId {
        self.formula
    }

    /// Variables of the original input, including those no longer occurring
    /// in the compiled formula.
    pub fn variables(&self) -> &BTreeSet<VariableIdx> {
        &self.variables
    }
}
