//! Graph mutation operations
//!
//! Methods for modifying the graph structure: adding and removing tensors
//! and operators, and rewiring operator inputs. Every edge is updated on
//! both of its ends.

use tracing::trace;

use crate::error::{PlanError, PlanResult};
use crate::ops::Operator;
use crate::tensor::{DataType, Tensor};

use super::context::Graph;
use super::maps::{Fuid, Guid, OpEntry};

impl Graph {
    // ========================================================================
    // Tensor mutation
    // ========================================================================

    /// Create an unconnected tensor and add it to the graph
    pub fn add_tensor(&mut self, shape: &[usize], dtype: DataType) -> Fuid {
        let tensor = Tensor::new(shape, dtype);
        let fuid = tensor.fuid();
        self.tensors.insert(fuid, tensor);
        fuid
    }

    /// Add an existing unconnected tensor
    pub fn insert_tensor(&mut self, tensor: Tensor) -> PlanResult<Fuid> {
        let fuid = tensor.fuid();
        if self.tensors.contains_key(&fuid) {
            return Err(PlanError::InvalidGraph(format!(
                "tensor {} is already in the graph",
                fuid
            )));
        }
        if tensor.source().is_some() || !tensor.targets().is_empty() {
            return Err(PlanError::InvalidGraph(format!(
                "tensor {} carries links from another graph",
                fuid
            )));
        }
        self.tensors.insert(fuid, tensor);
        Ok(fuid)
    }

    /// Remove a tensor from the table
    ///
    /// Does NOT touch operators referencing it; callers detach them first.
    pub fn remove_tensor(&mut self, fuid: Fuid) -> Option<Tensor> {
        self.tensors.shift_remove(&fuid)
    }

    // ========================================================================
    // Operator mutation
    // ========================================================================

    /// Append an operator and derive every edge it implies
    ///
    /// For each input the operator becomes a target and the input's producer
    /// becomes a predecessor; for each output the operator becomes the source
    /// and the output's consumers become successors.
    pub fn add_operator_and_connect(&mut self, op: Operator) -> PlanResult<Guid> {
        let guid = op.guid();
        if self.ops.contains_key(&guid) {
            return Err(PlanError::InvalidGraph(format!(
                "operator {} is already in the graph",
                guid
            )));
        }
        for &fuid in op.inputs().iter().chain(op.outputs()) {
            self.get_tensor(fuid)?;
        }
        for &fuid in op.outputs() {
            if let Some(source) = self.get_tensor(fuid)?.source() {
                return Err(PlanError::InvalidOperator(format!(
                    "tensor {} is already produced by operator {}",
                    fuid, source
                )));
            }
        }

        let inputs: Vec<Fuid> = op.inputs().to_vec();
        let outputs: Vec<Fuid> = op.outputs().to_vec();
        self.ops.insert(guid, OpEntry::new(op));
        self.sorted = false;

        for fuid in inputs {
            let producer = {
                let tensor = self.tensor_mut(fuid)?;
                tensor.add_target(guid);
                tensor.source()
            };
            if let Some(pred) = producer {
                self.link(pred, guid)?;
            }
        }
        for fuid in outputs {
            let consumers: Vec<Guid> = {
                let tensor = self.tensor_mut(fuid)?;
                tensor.set_source(Some(guid));
                tensor.targets().iter().copied().collect()
            };
            for succ in consumers {
                self.link(guid, succ)?;
            }
        }

        trace!(op = %guid, "operator connected");
        Ok(guid)
    }

    /// Remove an operator entry without touching its edges
    ///
    /// Use [`Graph::detach_operator`] first to keep the graph consistent.
    pub fn remove_operator(&mut self, guid: Guid) -> Option<Operator> {
        let entry = self.ops.shift_remove(&guid)?;
        self.sorted = false;
        Some(entry.op)
    }

    /// Unlink an operator from every tensor and neighbour
    ///
    /// The operator stays in the table with empty links so the caller can
    /// mark it eliminated or remove it.
    pub fn detach_operator(&mut self, guid: Guid) -> PlanResult<()> {
        let (inputs, outputs, preds, succs) = {
            let op = self.op(guid)?;
            (
                op.inputs().to_vec(),
                op.outputs().to_vec(),
                op.predecessors().iter().copied().collect::<Vec<_>>(),
                op.successors().iter().copied().collect::<Vec<_>>(),
            )
        };

        for fuid in inputs {
            if let Some(tensor) = self.tensors.get_mut(&fuid) {
                tensor.remove_target(guid);
            }
        }
        for fuid in outputs {
            if let Some(tensor) = self.tensors.get_mut(&fuid) {
                if tensor.source() == Some(guid) {
                    tensor.set_source(None);
                }
            }
        }
        for pred in preds {
            if let Some(entry) = self.ops.get_mut(&pred) {
                entry.op.remove_successor(guid);
            }
        }
        for succ in succs {
            if let Some(entry) = self.ops.get_mut(&succ) {
                entry.op.remove_predecessor(guid);
            }
        }
        self.op_mut(guid)?.clear_links();
        self.sorted = false;
        Ok(())
    }

    // ========================================================================
    // Operator input manipulation
    // ========================================================================

    /// Rewire input slot `index` of an operator to another tensor
    ///
    /// Returns the tensor previously in that slot. The old tensor loses the
    /// operator as a target only when no other slot still reads it, and the
    /// old producer stays a predecessor only while another input still comes
    /// from it.
    pub fn replace_input(&mut self, guid: Guid, index: usize, new_input: Fuid) -> PlanResult<Fuid> {
        self.get_tensor(new_input)?;
        let old_input = {
            let op = self.op_mut(guid)?;
            let arity = op.inputs().len();
            let slot = op.inputs_mut().get_mut(index).ok_or_else(|| {
                PlanError::InvalidOperator(format!(
                    "operator {} has {} inputs, no slot {}",
                    guid, arity, index
                ))
            })?;
            std::mem::replace(slot, new_input)
        };
        if old_input == new_input {
            return Ok(old_input);
        }

        let still_reads_old = self.op(guid)?.inputs().contains(&old_input);
        if !still_reads_old {
            let old_source = {
                let tensor = self.tensor_mut(old_input)?;
                tensor.remove_target(guid);
                tensor.source()
            };
            if let Some(pred) = old_source {
                if !self.feeds(pred, guid)? {
                    self.unlink(pred, guid);
                }
            }
        }

        let new_source = {
            let tensor = self.tensor_mut(new_input)?;
            tensor.add_target(guid);
            tensor.source()
        };
        if let Some(pred) = new_source {
            self.link(pred, guid)?;
        }

        self.sorted = false;
        trace!(op = %guid, slot = index, from = %old_input, to = %new_input, "input replaced");
        Ok(old_input)
    }

    /// Toggle the transpose flag of a MatMul operand slot
    pub fn toggle_matmul_trans(&mut self, guid: Guid, slot: usize) -> PlanResult<()> {
        let op = self.op_mut(guid)?;
        let toggled = op
            .kind_mut()
            .as_matmul_mut()
            .map(|attrs| attrs.toggle_trans(slot))
            .unwrap_or(false);
        if toggled {
            Ok(())
        } else {
            Err(PlanError::InvalidOperator(format!(
                "operator {} has no matmul operand slot {}",
                guid, slot
            )))
        }
    }

    // ========================================================================
    // Edge helpers
    // ========================================================================

    /// Whether any input of `consumer` is produced by `producer`
    fn feeds(&self, producer: Guid, consumer: Guid) -> PlanResult<bool> {
        let op = self.op(consumer)?;
        Ok(op
            .inputs()
            .iter()
            .filter_map(|fuid| self.tensors.get(fuid))
            .any(|t| t.source() == Some(producer)))
    }

    fn link(&mut self, pred: Guid, succ: Guid) -> PlanResult<()> {
        self.op_mut(pred)?.add_successor(succ);
        self.op_mut(succ)?.add_predecessor(pred);
        Ok(())
    }

    fn unlink(&mut self, pred: Guid, succ: Guid) {
        if let Some(entry) = self.ops.get_mut(&pred) {
            entry.op.remove_successor(succ);
        }
        if let Some(entry) = self.ops.get_mut(&succ) {
            entry.op.remove_predecessor(pred);
        }
    }
}
