//! Transpose optimization transformers

#![allow(missing_docs)]

use crate::error::{PlanError, PlanResult};
use crate::graph::{Graph, Guid};
use crate::ops::{OpKind, OpType};
use crate::transform::{bridge_consumers, can_fuse, eliminate_operator};

use super::common::{GraphTransformer, TransformResult};

/// Cancel a Transpose immediately undone by the next live Transpose
///
/// Matches operator `i` and the next live operator when both are Transpose
/// and the second permutation inverts the first. Consumers of the second
/// output read the first input instead, and both operators and both dead
/// outputs are removed.
///
/// The pair is left alone when the intermediate has other readers, or when
/// the second output has no consumer at all (it is a graph output).
#[derive(Debug, Default)]
pub struct CancelInverseTranspose;

impl CancelInverseTranspose {
    pub fn new() -> Self {
        Self
    }

    fn are_inverse(graph: &Graph, first: Guid, second: Guid) -> PlanResult<bool> {
        match (graph.op(first)?.kind(), graph.op(second)?.kind()) {
            (OpKind::Transpose(p1), OpKind::Transpose(p2)) => Ok(p1.cancels_with(p2)),
            _ => Ok(false),
        }
    }
}

impl GraphTransformer for CancelInverseTranspose {
    fn name(&self) -> &'static str {
        "CancelInverseTranspose"
    }

    fn apply_at(
        &self,
        graph: &mut Graph,
        order: &[Guid],
        pos: usize,
    ) -> PlanResult<Option<TransformResult>> {
        let first = order[pos];
        let Some(second) = graph.next_live(order, pos) else {
            return Ok(None);
        };
        if !Self::are_inverse(graph, first, second)? || !can_fuse(graph, first, second)? {
            return Ok(None);
        }

        let input = *graph
            .op(first)?
            .inputs()
            .first()
            .ok_or_else(|| PlanError::InvalidOperator(format!("transpose {} has no input", first)))?;
        let output = graph.output(second, 0)?;
        if graph.get_tensor(output)?.targets().is_empty() {
            return Ok(None);
        }

        let mut result = TransformResult::new();
        result.patterns_matched += 1;
        result.transforms_applied += 1;

        bridge_consumers(graph, output, input)?;
        result.record_elimination(eliminate_operator(graph, second)?);
        result.record_elimination(eliminate_operator(graph, first)?);
        Ok(Some(result))
    }

    fn is_applicable(&self, graph: &Graph) -> bool {
        graph.find_ops_by_kind(OpType::Transpose).len() >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::BinaryOp;
    use crate::tensor::DataType;
    use crate::transformers::common::run_transformers;
    use ndarray::{Array, Array3};

    #[test]
    fn test_cancel_inverse_pair() {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[2, 3, 4], DataType::Float32);
        let t1 = g.add_transpose(x, None, [0, 2, 1]).unwrap();
        let y1 = g.output(t1, 0).unwrap();
        let t2 = g.add_transpose(y1, None, [0, 2, 1]).unwrap();
        let y2 = g.output(t2, 0).unwrap();
        let add = g.add_binary(BinaryOp::Add, y2, x, None).unwrap();

        let result = CancelInverseTranspose::new().transform(&mut g).unwrap();
        assert_eq!(result.transforms_applied, 1);
        assert_eq!(result.operators_eliminated, 2);
        assert_eq!(result.tensors_eliminated, 2);

        assert!(g.find_ops_by_kind(OpType::Transpose).is_empty());
        assert_eq!(g.op(add).unwrap().inputs(), &[x, x]);
        assert!(!g.has_tensor(y1) && !g.has_tensor(y2));
        assert_eq!(g.get_tensor(x).unwrap().dims(), &[2, 3, 4]);
        assert!(g.check_valid().is_valid);
    }

    #[test]
    fn test_non_inverse_pair_kept() {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[2, 3, 4], DataType::Float32);
        let t1 = g.add_transpose(x, None, [1, 2, 0]).unwrap();
        let y1 = g.output(t1, 0).unwrap();
        let t2 = g.add_transpose(y1, None, [1, 2, 0]).unwrap();
        let y2 = g.output(t2, 0).unwrap();
        g.add_binary(BinaryOp::Add, y2, y2, None).unwrap();

        let result = CancelInverseTranspose::new().transform(&mut g).unwrap();
        assert!(result.is_empty());
        assert_eq!(g.op_count(), 3);
    }

    #[test]
    fn test_shared_intermediate_blocks_cancel() {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[2, 3, 4], DataType::Float32);
        let t1 = g.add_transpose(x, None, [0, 2, 1]).unwrap();
        let y1 = g.output(t1, 0).unwrap();
        let t2 = g.add_transpose(y1, None, [0, 2, 1]).unwrap();
        let y2 = g.output(t2, 0).unwrap();
        g.add_binary(BinaryOp::Add, y2, x, None).unwrap();
        g.add_binary(BinaryOp::Mul, y1, y1, None).unwrap();

        let result = CancelInverseTranspose::new().transform(&mut g).unwrap();
        assert!(result.is_empty());
        assert_eq!(g.find_ops_by_kind(OpType::Transpose).len(), 2);
    }

    #[test]
    fn test_graph_output_pair_kept() {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[2, 3], DataType::Float32);
        let t1 = g.add_transpose(x, None, [1, 0]).unwrap();
        let y1 = g.output(t1, 0).unwrap();
        g.add_transpose(y1, None, [1, 0]).unwrap();

        let result = CancelInverseTranspose::new().transform(&mut g).unwrap();
        assert!(result.is_empty());
        assert_eq!(g.op_count(), 2);
        assert!(g.check_valid().is_valid);
    }

    #[test]
    fn test_chain_of_four_collapses() {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[2, 3, 4], DataType::Float32);
        let mut cur = x;
        for perm in [[1, 2, 0], [2, 0, 1], [0, 2, 1], [0, 2, 1]] {
            let t = g.add_transpose(cur, None, perm).unwrap();
            cur = g.output(t, 0).unwrap();
        }
        let sink = g.add_binary(BinaryOp::Add, cur, x, None).unwrap();

        let transformer = CancelInverseTranspose::new();
        let result = run_transformers(&mut g, &[&transformer]).unwrap();
        assert_eq!(result.operators_eliminated, 4);
        assert_eq!(g.live_order(), vec![sink]);
        assert_eq!(g.op(sink).unwrap().inputs(), &[x, x]);
    }

    #[test]
    fn test_cancelled_pairs_are_identity_numerically() {
        let x: Array3<f32> = Array::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 12 + j * 4 + k) as f32);
        for (p1, p2) in [
            ([0, 2, 1], [0, 2, 1]),
            ([1, 2, 0], [2, 0, 1]),
            ([2, 1, 0], [2, 1, 0]),
        ] {
            let a = crate::ops::TransposeAttrs::new(p1);
            let b = crate::ops::TransposeAttrs::new(p2);
            assert!(a.cancels_with(&b));
            let round_trip = x.clone().permuted_axes(p1).permuted_axes(p2);
            assert_eq!(round_trip, x);
        }
    }
}
