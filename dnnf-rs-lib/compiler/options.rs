use bon::Builder;

/// Strategy used to build the d-tree over the non-unit clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DTreeStrategy {
    /// Eliminate variables of the clause interaction graph in min-fill
    /// order. Usually produces the narrowest separators.
    MinFill,
    /// Pair clause leaves level by level. Cheap to build, but separators can
    /// be wide.
    Balanced,
}

#[derive(Debug, Clone, Builder)]
pub struct CompilerOptions {
    #[builder(default = DTreeStrategy::MinFill)]
    pub dtree_strategy: DTreeStrategy,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions::builder().build()
    }
}
