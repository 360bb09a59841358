//! Graph query helpers and the textual dump

use std::fmt;

use rustc_hash::FxHashSet;

use crate::ops::{OpType, Operator};
use crate::tensor::Tensor;

use super::context::Graph;
use super::maps::{Fuid, Guid};

impl Graph {
    // ========================================================================
    // Lookups
    // ========================================================================

    /// Get a tensor by id, searching the table in order
    pub fn get_tensor_by_fuid(&self, fuid: Fuid) -> Option<&Tensor> {
        self.tensors.values().find(|t| t.fuid() == fuid)
    }

    /// Tensors without a producer
    pub fn graph_inputs(&self) -> Vec<Fuid> {
        self.tensors()
            .filter(|t| t.source().is_none())
            .map(|t| t.fuid())
            .collect()
    }

    /// Tensors without consumers
    pub fn graph_outputs(&self) -> Vec<Fuid> {
        self.tensors()
            .filter(|t| t.targets().is_empty())
            .map(|t| t.fuid())
            .collect()
    }

    /// Find live operators by kind
    pub fn find_ops_by_kind(&self, op_type: OpType) -> Vec<Guid> {
        self.operators()
            .filter(|op| op.op_type() == op_type)
            .map(|op| op.guid())
            .collect()
    }

    /// Operator producing a tensor
    pub fn producer(&self, fuid: Fuid) -> Option<&Operator> {
        self.tensor(fuid)?.source().and_then(|g| self.operator(g))
    }

    /// Operators consuming a tensor
    pub fn consumers(&self, fuid: Fuid) -> Vec<&Operator> {
        self.tensor(fuid)
            .map(|t| {
                t.targets()
                    .iter()
                    .filter_map(|&g| self.operator(g))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// All operators `guid` transitively depends on
    pub fn ancestors(&self, guid: Guid) -> Vec<Guid> {
        let mut result = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_ancestors(guid, &mut result, &mut visited);
        result
    }

    fn collect_ancestors(&self, guid: Guid, result: &mut Vec<Guid>, visited: &mut FxHashSet<Guid>) {
        let Some(op) = self.operator(guid) else {
            return;
        };
        for &pred in op.predecessors() {
            if visited.insert(pred) {
                result.push(pred);
                self.collect_ancestors(pred, result, visited);
            }
        }
    }
}

fn join<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Tensors:")?;
        for tensor in self.tensors() {
            writeln!(f, "{}", tensor)?;
        }
        writeln!(f, "Graph operators:")?;
        for op in self.operators() {
            writeln!(
                f,
                "OP {}, pred [{}], succ [{}], {}",
                op.guid(),
                join(op.predecessors()),
                join(op.successors()),
                op
            )?;
        }
        Ok(())
    }
}
