//! Graph container
//!
//! `Graph` is the central structure for building, rewriting and planning a
//! dataflow graph. It owns every tensor and operator, the execution order,
//! and the arena allocator used by memory planning.

use std::sync::Arc;

use crate::allocator::{Allocator, CpuRuntime, Runtime};
use crate::error::{PlanError, PlanResult};
use crate::ops::Operator;
use crate::tensor::{Tensor, MAX_DTYPE_SIZE};

use super::maps::{Fuid, Guid, OperatorMap, TensorMap};

/// How `data_malloc` lays tensors out in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanStrategy {
    /// One range per tensor in table order, nothing is freed
    #[default]
    Static,
    /// Intermediates are freed after their last consumer runs
    Liveness,
}

/// Graph configuration
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Arena alignment in bytes
    pub alignment: usize,
    /// Memory layout strategy
    pub strategy: PlanStrategy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            alignment: MAX_DTYPE_SIZE,
            strategy: PlanStrategy::Static,
        }
    }
}

/// Dataflow graph of tensors and operators
///
/// Invariants (audited by [`Graph::check_valid`]):
/// - every tensor's source and targets are live operators of this graph
/// - every operator's inputs and outputs are tensors of this graph
/// - predecessor/successor sets mirror the tensor links
/// - no tensor is isolated from both a producer and consumers
#[derive(Debug)]
pub struct Graph {
    /// Maps fuid → tensor (insertion order)
    pub(crate) tensors: TensorMap,

    /// Maps guid → entry (execution order)
    pub(crate) ops: OperatorMap,

    /// Whether `ops` is in topological order
    pub(crate) sorted: bool,

    pub(crate) allocator: Allocator,

    config: GraphConfig,
}

impl Graph {
    /// Create an empty graph planning memory for `runtime`
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self::with_config(runtime, GraphConfig::default())
    }

    /// Create an empty graph with explicit configuration
    pub fn with_config(runtime: Arc<dyn Runtime>, config: GraphConfig) -> Self {
        Self {
            tensors: TensorMap::default(),
            ops: OperatorMap::default(),
            sorted: true,
            allocator: Allocator::with_alignment(runtime, config.alignment),
            config,
        }
    }

    /// Create an empty graph on the host runtime
    pub fn cpu() -> Self {
        Self::new(Arc::new(CpuRuntime))
    }

    /// Active configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// The arena allocator
    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Whether the operator sequence is in topological order
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    // ========================================================================
    // Tensor accessors
    // ========================================================================

    /// Get a tensor by id
    pub fn tensor(&self, fuid: Fuid) -> Option<&Tensor> {
        self.tensors.get(&fuid)
    }

    /// Get a tensor by id, failing if absent
    pub fn get_tensor(&self, fuid: Fuid) -> PlanResult<&Tensor> {
        self.tensors
            .get(&fuid)
            .ok_or(PlanError::TensorNotFound(fuid))
    }

    pub(crate) fn tensor_mut(&mut self, fuid: Fuid) -> PlanResult<&mut Tensor> {
        self.tensors
            .get_mut(&fuid)
            .ok_or(PlanError::TensorNotFound(fuid))
    }

    /// Check if a tensor exists
    pub fn has_tensor(&self, fuid: Fuid) -> bool {
        self.tensors.contains_key(&fuid)
    }

    /// Number of tensors
    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    /// Iterate over tensors in table order
    pub fn tensors(&self) -> impl Iterator<Item = &Tensor> {
        self.tensors.values()
    }

    // ========================================================================
    // Operator accessors
    // ========================================================================

    /// Get a live operator by id
    pub fn operator(&self, guid: Guid) -> Option<&Operator> {
        self.ops
            .get(&guid)
            .filter(|e| !e.eliminated)
            .map(|e| &e.op)
    }

    /// Get a live operator by id, failing if absent
    pub fn op(&self, guid: Guid) -> PlanResult<&Operator> {
        self.operator(guid).ok_or(PlanError::OperatorNotFound(guid))
    }

    pub(crate) fn op_mut(&mut self, guid: Guid) -> PlanResult<&mut Operator> {
        self.ops
            .get_mut(&guid)
            .filter(|e| !e.eliminated)
            .map(|e| &mut e.op)
            .ok_or(PlanError::OperatorNotFound(guid))
    }

    /// Check if a live operator exists
    pub fn has_operator(&self, guid: Guid) -> bool {
        self.operator(guid).is_some()
    }

    /// Number of live operators
    pub fn op_count(&self) -> usize {
        self.ops.values().filter(|e| !e.eliminated).count()
    }

    /// Iterate over live operators in sequence order
    pub fn operators(&self) -> impl Iterator<Item = &Operator> {
        self.ops
            .values()
            .filter(|e| !e.eliminated)
            .map(|e| &e.op)
    }

    /// Live operator ids in sequence order
    pub fn live_order(&self) -> Vec<Guid> {
        self.operators().map(|op| op.guid()).collect()
    }

    /// First live operator after `pos` in a snapshot of the sequence
    pub fn next_live(&self, order: &[Guid], pos: usize) -> Option<Guid> {
        order
            .iter()
            .skip(pos + 1)
            .copied()
            .find(|&guid| !self.is_eliminated(guid))
    }

    // ========================================================================
    // Operator state management
    // ========================================================================

    /// Mark an operator for elimination at the next compaction
    pub fn mark_eliminated(&mut self, guid: Guid) -> bool {
        if let Some(entry) = self.ops.get_mut(&guid) {
            entry.mark_eliminated();
            self.sorted = false;
            true
        } else {
            false
        }
    }

    /// Check if an operator is marked for elimination
    pub fn is_eliminated(&self, guid: Guid) -> bool {
        self.ops.get(&guid).map(|e| e.eliminated).unwrap_or(false)
    }

    /// Drop eliminated entries, keeping the order of the rest
    pub fn compact(&mut self) -> usize {
        let before = self.ops.len();
        self.ops.retain(|_, e| !e.eliminated);
        before - self.ops.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::DataType;

    fn chain() -> (Graph, Vec<Guid>) {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[2, 3, 4], DataType::Float32);
        let t0 = g.add_transpose(x, None, [0, 2, 1]).unwrap();
        let y = g.output(t0, 0).unwrap();
        let t1 = g.add_transpose(y, None, [1, 0, 2]).unwrap();
        (g, vec![t0, t1])
    }

    #[test]
    fn test_graph_creation() {
        let (g, guids) = chain();
        assert_eq!(g.op_count(), 2);
        assert_eq!(g.tensor_count(), 3);
        assert!(guids.iter().all(|&guid| g.has_operator(guid)));
        assert!(!g.is_sorted());
    }

    #[test]
    fn test_get_missing() {
        let g = Graph::cpu();
        assert!(matches!(
            g.get_tensor(Fuid::from_raw(usize::MAX)),
            Err(PlanError::TensorNotFound(_))
        ));
        assert!(g.op(Guid::from_raw(usize::MAX)).is_err());
    }

    #[test]
    fn test_mark_eliminated_and_compact() {
        let (mut g, guids) = chain();
        assert!(g.mark_eliminated(guids[0]));
        assert!(g.is_eliminated(guids[0]));
        assert!(g.operator(guids[0]).is_none());
        assert_eq!(g.op_count(), 1);

        assert_eq!(g.compact(), 1);
        assert_eq!(g.live_order(), vec![guids[1]]);
    }

    #[test]
    fn test_next_live_skips_eliminated() {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[4], DataType::Float32);
        let a = g.add_binary(crate::ops::BinaryOp::Add, x, x, None).unwrap();
        let ya = g.output(a, 0).unwrap();
        let b = g.add_binary(crate::ops::BinaryOp::Mul, ya, x, None).unwrap();
        let yb = g.output(b, 0).unwrap();
        let c = g.add_binary(crate::ops::BinaryOp::Sub, yb, x, None).unwrap();

        let order = g.live_order();
        g.mark_eliminated(b);
        assert_eq!(g.next_live(&order, 0), Some(c));
        assert_eq!(g.next_live(&order, 2), None);
    }

    #[test]
    fn test_config_alignment_reaches_allocator() {
        let config = GraphConfig {
            alignment: 64,
            ..Default::default()
        };
        let g = Graph::with_config(Arc::new(CpuRuntime), config);
        assert_eq!(g.allocator().alignment(), 64);
        assert_eq!(g.config().strategy, PlanStrategy::Static);
    }
}
