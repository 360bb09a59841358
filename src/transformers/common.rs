//! Common types for transformers
//!
//! The [`GraphTransformer`] trait every rewrite implements, and the
//! [`TransformResult`] statistics they report.

use crate::error::PlanResult;
use crate::graph::{Fuid, Graph, Guid};
use crate::transform::{EliminationResult, TransformEngine};

/// Transformation result for statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Number of patterns matched
    pub patterns_matched: usize,
    /// Number of transformations applied
    pub transforms_applied: usize,
    /// Number of operators eliminated
    pub operators_eliminated: usize,
    /// Number of tensors removed
    pub tensors_eliminated: usize,
    /// Ids of rewritten or eliminated operators
    pub transformed_ops: Vec<Guid>,
    /// Ids of removed tensors
    pub removed_tensors: Vec<Fuid>,
}

impl TransformResult {
    /// Create empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful transformation anchored at `op`
    pub fn record(&mut self, op: Guid) {
        self.transforms_applied += 1;
        self.transformed_ops.push(op);
    }

    /// Record the operators and tensors an elimination removed
    pub fn record_elimination(&mut self, eliminated: EliminationResult) {
        self.operators_eliminated += eliminated.operators.len();
        self.tensors_eliminated += eliminated.tensors.len();
        self.transformed_ops.extend(eliminated.operators);
        self.removed_tensors.extend(eliminated.tensors);
    }

    /// Whether anything changed
    pub fn is_empty(&self) -> bool {
        self.transforms_applied == 0 && self.operators_eliminated == 0
    }

    /// Merge with another result
    pub fn merge(&mut self, other: TransformResult) {
        self.patterns_matched += other.patterns_matched;
        self.transforms_applied += other.transforms_applied;
        self.operators_eliminated += other.operators_eliminated;
        self.tensors_eliminated += other.tensors_eliminated;
        self.transformed_ops.extend(other.transformed_ops);
        self.removed_tensors.extend(other.removed_tensors);
    }
}

/// A local rewrite over the operator sequence
///
/// The engine hands each transformer a snapshot of the live sequence and a
/// position; the transformer either declines or rewrites the graph around
/// that position, keeping every edge consistent.
pub trait GraphTransformer {
    /// Name of the transformer
    fn name(&self) -> &'static str;

    /// Try to rewrite at `order[pos]`
    ///
    /// # Returns
    /// * `Ok(None)` if the pattern does not match there
    /// * `Ok(Some(result))` after rewriting
    fn apply_at(
        &self,
        graph: &mut Graph,
        order: &[Guid],
        pos: usize,
    ) -> PlanResult<Option<TransformResult>>;

    /// Check if this transformer is applicable to the graph
    fn is_applicable(&self, _graph: &Graph) -> bool {
        true
    }

    /// Apply this transformer alone until nothing changes
    fn transform(&self, graph: &mut Graph) -> PlanResult<TransformResult>
    where
        Self: Sized,
    {
        let this: &dyn GraphTransformer = self;
        run_transformers(graph, &[this])
    }
}

/// Run several transformers interleaved until nothing changes
///
/// At every position the transformers are tried in the given order and the
/// first one that fires wins.
pub fn run_transformers(
    graph: &mut Graph,
    transformers: &[&dyn GraphTransformer],
) -> PlanResult<TransformResult> {
    let mut engine = TransformEngine::new(graph);
    engine.run(transformers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_result() {
        let mut result = TransformResult::new();
        assert!(result.is_empty());

        let op = Guid::fresh();
        let gone = Guid::fresh();
        let tensor = Fuid::fresh();
        result.record(op);
        result.record_elimination(EliminationResult {
            operators: vec![gone],
            tensors: vec![tensor],
        });

        assert_eq!(result.transforms_applied, 1);
        assert_eq!(result.operators_eliminated, 1);
        assert_eq!(result.tensors_eliminated, 1);
        assert_eq!(result.transformed_ops, vec![op, gone]);
        assert!(!result.is_empty());
    }

    #[test]
    fn test_merge() {
        let mut a = TransformResult::new();
        a.patterns_matched = 2;
        a.record(Guid::fresh());
        let mut b = TransformResult::new();
        b.patterns_matched = 1;
        b.record(Guid::fresh());
        a.merge(b);
        assert_eq!(a.patterns_matched, 3);
        assert_eq!(a.transforms_applied, 2);
        assert_eq!(a.transformed_ops.len(), 2);
    }
}
