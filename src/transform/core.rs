//! Core transformation loop
//!
//! Runs local rewrites over the operator sequence until a round changes
//! nothing. Each round works on a snapshot of the live sequence: retired
//! operators are only marked eliminated while the round scans, and are
//! compacted away once it ends.

use tracing::{debug, warn};

use crate::error::PlanResult;
use crate::graph::{Graph, Guid};
use crate::transformers::common::{GraphTransformer, TransformResult};

/// Transform configuration
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Maximum rounds to prevent infinite loops
    pub max_iterations: usize,
    /// Whether to continue on individual transform errors
    pub continue_on_error: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            continue_on_error: false,
        }
    }
}

/// Statistics from a transform run
#[derive(Debug, Default, Clone)]
pub struct TransformStats {
    /// Number of rounds performed
    pub rounds: usize,
    /// Number of transformations applied
    pub transforms_applied: usize,
    /// Number of transform errors skipped
    pub errors_skipped: usize,
    /// Whether the last round changed nothing
    pub converged: bool,
}

/// Main transformation engine
///
/// Borrows the graph mutably for the duration of the run.
pub struct TransformEngine<'g> {
    graph: &'g mut Graph,
    config: TransformConfig,
    stats: TransformStats,
}

impl<'g> TransformEngine<'g> {
    /// Create a new transform engine over a graph
    pub fn new(graph: &'g mut Graph) -> Self {
        Self {
            graph,
            config: TransformConfig::default(),
            stats: TransformStats::default(),
        }
    }

    /// Configure the engine
    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the graph
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Get statistics
    pub fn stats(&self) -> &TransformStats {
        &self.stats
    }

    /// Run rounds until a fixed point or the round limit
    pub fn run(&mut self, transformers: &[&dyn GraphTransformer]) -> PlanResult<TransformResult> {
        let active: Vec<&dyn GraphTransformer> = transformers
            .iter()
            .copied()
            .filter(|t| t.is_applicable(self.graph))
            .collect();
        let mut total = TransformResult::new();
        if active.is_empty() {
            self.stats.converged = true;
            return Ok(total);
        }

        while self.stats.rounds < self.config.max_iterations {
            let changed = self.run_round(&active, &mut total)?;
            self.stats.rounds += 1;
            if !changed {
                self.stats.converged = true;
                break;
            }
        }

        if !self.stats.converged {
            warn!(
                rounds = self.stats.rounds,
                "rewrite stopped at the round limit before reaching a fixed point"
            );
        }
        Ok(total)
    }

    /// One left-to-right scan over a snapshot of the live sequence
    ///
    /// After a transformer fires, the same position is examined again before
    /// moving on, since the rewrite may have created a new match there.
    fn run_round(
        &mut self,
        transformers: &[&dyn GraphTransformer],
        total: &mut TransformResult,
    ) -> PlanResult<bool> {
        let order: Vec<Guid> = self.graph.live_order();
        let mut changed = false;
        let mut pos = 0;

        while pos < order.len() {
            if self.graph.is_eliminated(order[pos]) {
                pos += 1;
                continue;
            }

            let mut fired = false;
            for transformer in transformers {
                match transformer.apply_at(self.graph, &order, pos) {
                    Ok(Some(result)) => {
                        debug!(
                            transformer = transformer.name(),
                            op = %order[pos],
                            eliminated = result.operators_eliminated,
                            "rewrite applied"
                        );
                        self.stats.transforms_applied += result.transforms_applied;
                        total.merge(result);
                        fired = true;
                        break;
                    }
                    Ok(None) => {}
                    Err(e) if self.config.continue_on_error => {
                        warn!(transformer = transformer.name(), op = %order[pos], error = %e, "rewrite skipped");
                        self.stats.errors_skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            if fired {
                changed = true;
            } else {
                pos += 1;
            }
        }

        self.graph.compact();
        debug_assert!(
            self.graph.check_valid().is_valid,
            "graph invariants broken by rewrite: {:?}",
            self.graph.check_valid().errors
        );
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanError;
    use crate::ops::BinaryOp;
    use crate::tensor::DataType;
    use crate::transform::eliminate_operator;

    /// Removes x + x operators whose output feeds something else
    struct DropSelfAdd;

    impl GraphTransformer for DropSelfAdd {
        fn name(&self) -> &'static str {
            "DropSelfAdd"
        }

        fn apply_at(
            &self,
            graph: &mut Graph,
            order: &[Guid],
            pos: usize,
        ) -> PlanResult<Option<TransformResult>> {
            let guid = order[pos];
            let op = graph.op(guid)?;
            let (input, output) = match (op.inputs(), op.outputs()) {
                ([a, b], [out]) if a == b => (*a, *out),
                _ => return Ok(None),
            };
            if graph.get_tensor(output)?.targets().is_empty() {
                return Ok(None);
            }
            crate::transform::bridge_consumers(graph, output, input)?;
            let mut result = TransformResult::new();
            result.patterns_matched += 1;
            result.record(guid);
            result.record_elimination(eliminate_operator(graph, guid)?);
            Ok(Some(result))
        }
    }

    /// Always fails
    struct Broken;

    impl GraphTransformer for Broken {
        fn name(&self) -> &'static str {
            "Broken"
        }

        fn apply_at(&self, _: &mut Graph, order: &[Guid], pos: usize) -> PlanResult<Option<TransformResult>> {
            Err(PlanError::OperatorNotFound(order[pos]))
        }
    }

    fn self_add_chain(n: usize) -> Graph {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[4], DataType::Float32);
        let mut cur = x;
        for _ in 0..n {
            let op = g.add_binary(BinaryOp::Add, cur, cur, None).unwrap();
            cur = g.output(op, 0).unwrap();
        }
        g.add_binary(BinaryOp::Mul, cur, x, None).unwrap();
        g
    }

    #[test]
    fn test_fixed_point() {
        let mut g = self_add_chain(3);
        let mut engine = TransformEngine::new(&mut g);
        let result = engine.run(&[&DropSelfAdd]).unwrap();
        assert_eq!(result.operators_eliminated, 3);
        assert!(engine.stats().converged);
        assert_eq!(g.op_count(), 1);
        assert!(g.check_valid().is_valid);
    }

    #[test]
    fn test_round_limit() {
        let mut g = self_add_chain(3);
        let config = TransformConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let mut engine = TransformEngine::new(&mut g).with_config(config);
        let result = engine.run(&[&DropSelfAdd]).unwrap();
        assert!(result.is_empty());
        assert!(!engine.stats().converged);
        assert_eq!(g.op_count(), 4);
    }

    #[test]
    fn test_errors_propagate_or_skip() {
        let mut g = self_add_chain(1);
        assert!(TransformEngine::new(&mut g).run(&[&Broken]).is_err());

        let config = TransformConfig {
            continue_on_error: true,
            ..Default::default()
        };
        let mut engine = TransformEngine::new(&mut g).with_config(config);
        let result = engine.run(&[&Broken, &DropSelfAdd]).unwrap();
        assert_eq!(result.operators_eliminated, 1);
        assert!(engine.stats().errors_skipped > 0);
    }
}
