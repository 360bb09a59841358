//! MatMul fusion transformers
//!
//! Fold a Transpose that swaps the last two axes into the transpose flag of
//! the MatMul operand it feeds.

#![allow(missing_docs)]

use crate::error::{PlanError, PlanResult};
use crate::graph::{Graph, Guid};
use crate::ops::OpType;
use crate::transform::{eliminate_operator, fused_slot};

use super::common::{GraphTransformer, TransformResult};

/// Fuse Transpose + MatMul into MatMul with `trans_a` / `trans_b`
#[derive(Debug, Default)]
pub struct FuseTransposeMatMul;

impl FuseTransposeMatMul {
    pub fn new() -> Self {
        Self
    }

    /// Producer of `slot` when it is a last-two-axes Transpose read only there
    fn fusible_producer(graph: &Graph, matmul: Guid, slot: usize) -> PlanResult<Option<Guid>> {
        let Some(&operand) = graph.op(matmul)?.inputs().get(slot) else {
            return Ok(None);
        };
        let Some(producer) = graph.get_tensor(operand)?.source() else {
            return Ok(None);
        };
        let swaps = graph
            .op(producer)?
            .kind()
            .as_transpose()
            .is_some_and(|attrs| attrs.swaps_last_two());
        if !swaps || fused_slot(graph, producer, matmul)? != Some(slot) {
            return Ok(None);
        }
        Ok(Some(producer))
    }
}

impl GraphTransformer for FuseTransposeMatMul {
    fn name(&self) -> &'static str {
        "FuseTransposeMatMul"
    }

    fn apply_at(
        &self,
        graph: &mut Graph,
        order: &[Guid],
        pos: usize,
    ) -> PlanResult<Option<TransformResult>> {
        let matmul = order[pos];
        if graph.op(matmul)?.op_type() != OpType::MatMul {
            return Ok(None);
        }

        for slot in 0..2 {
            let Some(transpose) = Self::fusible_producer(graph, matmul, slot)? else {
                continue;
            };
            let source = *graph.op(transpose)?.inputs().first().ok_or_else(|| {
                PlanError::InvalidOperator(format!("transpose {} has no input", transpose))
            })?;

            let mut result = TransformResult::new();
            result.patterns_matched += 1;

            graph.toggle_matmul_trans(matmul, slot)?;
            graph.replace_input(matmul, slot, source)?;
            result.record(matmul);
            result.record_elimination(eliminate_operator(graph, transpose)?);
            return Ok(Some(result));
        }

        Ok(None)
    }

    fn is_applicable(&self, graph: &Graph) -> bool {
        !graph.find_ops_by_kind(OpType::MatMul).is_empty()
            && !graph.find_ops_by_kind(OpType::Transpose).is_empty()
    }
}
