//! Operator elimination
//!
//! Retires operators from the graph: every edge is unlinked, the entry is
//! marked for compaction, and outputs left without producer or consumers
//! are dropped from the tensor table.

use tracing::trace;

use crate::error::PlanResult;
use crate::graph::{Fuid, Graph, Guid};

/// Result of an elimination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EliminationResult {
    /// Operators marked eliminated
    pub operators: Vec<Guid>,
    /// Tensors removed from the table
    pub tensors: Vec<Fuid>,
}

impl EliminationResult {
    /// Fold another result into this one
    pub fn merge(&mut self, other: EliminationResult) {
        self.operators.extend(other.operators);
        self.tensors.extend(other.tensors);
    }
}

/// Detach an operator, mark it eliminated and drop orphaned outputs
///
/// Consumers of its outputs must already have been bridged elsewhere;
/// outputs that still have consumers are kept, producerless.
pub fn eliminate_operator(graph: &mut Graph, guid: Guid) -> PlanResult<EliminationResult> {
    let outputs = graph.op(guid)?.outputs().to_vec();
    graph.detach_operator(guid)?;
    graph.mark_eliminated(guid);

    let tensors = outputs
        .into_iter()
        .filter(|&fuid| drop_orphan_tensor(graph, fuid))
        .collect();
    trace!(op = %guid, "operator eliminated");

    Ok(EliminationResult {
        operators: vec![guid],
        tensors,
    })
}

/// Remove a tensor that has neither producer nor consumers
///
/// # Returns
/// * `true` if the tensor was removed
pub fn drop_orphan_tensor(graph: &mut Graph, fuid: Fuid) -> bool {
    let orphan = graph
        .tensor(fuid)
        .is_some_and(|t| t.source().is_none() && t.targets().is_empty());
    orphan && graph.remove_tensor(fuid).is_some()
}
