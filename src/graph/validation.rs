//! Graph validation
//!
//! Audit the structural invariants of a [`Graph`]: membership of every
//! referenced id, agreement between the two ends of each edge, and the
//! absence of isolated tensors.

use rustc_hash::FxHashSet;

use crate::error::{PlanError, PlanResult};

use super::context::Graph;
use super::maps::Guid;

/// Validation result with detailed issues
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the graph is valid
    pub is_valid: bool,
    /// List of errors (broken invariants)
    pub errors: Vec<String>,
    /// List of warnings (non-critical issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.is_valid = false;
    }

    /// Add a warning
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merge with another result
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl Graph {
    /// Check every structural invariant, collecting all violations
    pub fn check_valid(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();
        result.merge(self.validate_tensors());
        result.merge(self.validate_operators());

        let pending = self.ops.values().filter(|e| e.eliminated).count();
        if pending > 0 {
            result.add_warning(format!("{} eliminated operators await compaction", pending));
        }
        result
    }

    /// Like [`Graph::check_valid`], failing on the first batch of errors
    pub fn ensure_valid(&self) -> PlanResult<()> {
        let result = self.check_valid();
        if result.is_valid {
            Ok(())
        } else {
            Err(PlanError::InvalidGraph(result.errors.join("; ")))
        }
    }

    fn validate_tensors(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for (&key, tensor) in &self.tensors {
            let fuid = tensor.fuid();
            if key != fuid {
                result.add_error(format!("tensor {} stored under key {}", fuid, key));
            }
            if tensor.source().is_none() && tensor.targets().is_empty() {
                result.add_error(format!("tensor {} is isolated", fuid));
            }

            if let Some(source) = tensor.source() {
                match self.operator(source) {
                    None => result.add_error(format!(
                        "tensor {}: source {} is not in the graph",
                        fuid, source
                    )),
                    Some(op) if !op.outputs().contains(&fuid) => result.add_error(format!(
                        "tensor {}: source {} does not list it as an output",
                        fuid, source
                    )),
                    Some(_) => {}
                }
            }

            for &target in tensor.targets() {
                match self.operator(target) {
                    None => result.add_error(format!(
                        "tensor {}: target {} is not in the graph",
                        fuid, target
                    )),
                    Some(op) if !op.inputs().contains(&fuid) => result.add_error(format!(
                        "tensor {}: target {} does not list it as an input",
                        fuid, target
                    )),
                    Some(_) => {}
                }
            }
        }

        result
    }

    fn validate_operators(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for op in self.operators() {
            let guid = op.guid();
            let mut expected_preds: FxHashSet<Guid> = FxHashSet::default();
            let mut expected_succs: FxHashSet<Guid> = FxHashSet::default();

            for &fuid in op.inputs() {
                match self.tensor(fuid) {
                    None => result.add_error(format!(
                        "operator {}: input {} is not in the graph",
                        guid, fuid
                    )),
                    Some(tensor) => {
                        if !tensor.targets().contains(&guid) {
                            result.add_error(format!(
                                "operator {}: input {} does not list it as a target",
                                guid, fuid
                            ));
                        }
                        expected_preds.extend(tensor.source());
                    }
                }
            }

            for &fuid in op.outputs() {
                match self.tensor(fuid) {
                    None => result.add_error(format!(
                        "operator {}: output {} is not in the graph",
                        guid, fuid
                    )),
                    Some(tensor) => {
                        if tensor.source() != Some(guid) {
                            result.add_error(format!(
                                "operator {}: output {} has a different source",
                                guid, fuid
                            ));
                        }
                        expected_succs.extend(tensor.targets().iter().copied());
                    }
                }
            }

            for pred in op.predecessors() {
                if !self.has_operator(*pred) {
                    result.add_error(format!(
                        "operator {}: predecessor {} is not in the graph",
                        guid, pred
                    ));
                }
            }
            for succ in op.successors() {
                if !self.has_operator(*succ) {
                    result.add_error(format!(
                        "operator {}: successor {} is not in the graph",
                        guid, succ
                    ));
                }
            }

            let preds: FxHashSet<Guid> = op.predecessors().iter().copied().collect();
            if preds != expected_preds {
                result.add_error(format!(
                    "operator {}: predecessors disagree with its inputs' producers",
                    guid
                ));
            }
            let succs: FxHashSet<Guid> = op.successors().iter().copied().collect();
            if succs != expected_succs {
                result.add_error(format!(
                    "operator {}: successors disagree with its outputs' consumers",
                    guid
                ));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::maps::Fuid;
    use crate::ops::BinaryOp;
    use crate::tensor::DataType;

    fn small_graph() -> (Graph, Guid, Fuid) {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[4], DataType::Float32);
        let a = g.add_binary(BinaryOp::Add, x, x, None).unwrap();
        let y = g.output(a, 0).unwrap();
        g.add_binary(BinaryOp::Mul, y, x, None).unwrap();
        (g, a, y)
    }

    #[test]
    fn test_valid_graph() {
        let (g, _, _) = small_graph();
        let result = g.check_valid();
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(g.ensure_valid().is_ok());
    }

    #[test]
    fn test_isolated_tensor() {
        let (mut g, _, _) = small_graph();
        let lonely = g.add_tensor(&[1], DataType::Int32);
        let result = g.check_valid();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains(&lonely.to_string())));
    }

    #[test]
    fn test_broken_mirror_edges() {
        let (mut g, a, y) = small_graph();
        // drop one end of an edge only
        g.tensor_mut(y).unwrap().set_source(None);
        let result = g.check_valid();
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains(&format!("operator {}", a))));
        assert!(matches!(g.ensure_valid(), Err(PlanError::InvalidGraph(_))));
    }

    #[test]
    fn test_pending_elimination_warns() {
        let (mut g, a, _) = small_graph();
        g.mark_eliminated(a);
        let result = g.check_valid();
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_merge() {
        let mut a = ValidationResult::valid();
        let mut b = ValidationResult::valid();
        b.add_error("broken");
        a.merge(b);
        assert!(!a.is_valid);
        assert_eq!(a.errors.len(), 1);
    }
}
