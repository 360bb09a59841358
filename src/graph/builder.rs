//! Typed operator construction
//!
//! Each constructor validates its inputs, runs the kind's shape function and
//! either creates the output tensors or checks the supplied ones against the
//! inferred shapes before wiring the operator into the graph.

use crate::error::{PlanError, PlanResult};
use crate::ops::{BinaryOp, ConcatAttrs, MatMulAttrs, OpKind, Operator, TransposeAttrs};
use crate::tensor::Shape;
use crate::traits::InferShape;

use super::context::Graph;
use super::maps::{Fuid, Guid};

impl Graph {
    /// Add an operator of any kind
    ///
    /// With `outputs == None` fresh output tensors are created from the
    /// inferred shapes, using the dtype of the first input.
    pub fn add_op(
        &mut self,
        kind: OpKind,
        inputs: &[Fuid],
        outputs: Option<&[Fuid]>,
    ) -> PlanResult<Guid> {
        let mut input_refs = Vec::with_capacity(inputs.len());
        for &fuid in inputs {
            input_refs.push(self.get_tensor(fuid)?);
        }
        let dtype = input_refs
            .first()
            .map(|t| t.dtype())
            .ok_or_else(|| PlanError::InvalidOperator(format!("{:?} needs at least one input", kind.op_type())))?;

        let shapes: Vec<Shape> = kind.infer_shape(&input_refs).ok_or_else(|| {
            let dims: Vec<Vec<usize>> = input_refs.iter().map(|t| t.dims().to_vec()).collect();
            PlanError::InvalidOperator(format!(
                "{:?} rejects input shapes {:?}",
                kind.op_type(),
                dims
            ))
        })?;

        let outputs: Vec<Fuid> = match outputs {
            Some(given) => {
                if given.len() != shapes.len() {
                    return Err(PlanError::InvalidOperator(format!(
                        "{:?} produces {} outputs, {} supplied",
                        kind.op_type(),
                        shapes.len(),
                        given.len()
                    )));
                }
                for (&fuid, shape) in given.iter().zip(&shapes) {
                    let tensor = self.get_tensor(fuid)?;
                    if tensor.dims() != shape.as_slice() {
                        return Err(PlanError::ShapeMismatch {
                            tensor: fuid,
                            expected: shape.to_vec(),
                            actual: tensor.dims().to_vec(),
                        });
                    }
                }
                given.to_vec()
            }
            None => shapes
                .iter()
                .map(|shape| self.add_tensor(shape, dtype))
                .collect(),
        };

        self.add_operator_and_connect(Operator::new(kind, inputs.iter().copied(), outputs))
    }

    /// Add a Transpose of `input` by `perm`
    pub fn add_transpose(
        &mut self,
        input: Fuid,
        output: Option<Fuid>,
        perm: impl IntoIterator<Item = usize>,
    ) -> PlanResult<Guid> {
        let attrs = TransposeAttrs::new(perm);
        if !attrs.is_permutation() {
            return Err(PlanError::InvalidOperator(format!(
                "{:?} is not a permutation",
                attrs.perm()
            )));
        }
        let outputs = output.map(|o| [o]);
        self.add_op(OpKind::Transpose(attrs), &[input], outputs.as_ref().map(|o| &o[..]))
    }

    /// Add a MatMul `C = op(A) x op(B)`
    pub fn add_matmul(
        &mut self,
        a: Fuid,
        b: Fuid,
        output: Option<Fuid>,
        trans_a: bool,
        trans_b: bool,
    ) -> PlanResult<Guid> {
        let outputs = output.map(|o| [o]);
        self.add_op(
            OpKind::MatMul(MatMulAttrs::new(trans_a, trans_b)),
            &[a, b],
            outputs.as_ref().map(|o| &o[..]),
        )
    }

    /// Add a Concat of `inputs` along `axis` (negative counts from the end)
    pub fn add_concat(&mut self, inputs: &[Fuid], output: Option<Fuid>, axis: i64) -> PlanResult<Guid> {
        let first = inputs
            .first()
            .ok_or_else(|| PlanError::InvalidOperator("Concat needs at least one input".into()))?;
        let rank = self.get_tensor(*first)?.rank();
        let attrs = ConcatAttrs::new(axis, rank)?;
        let outputs = output.map(|o| [o]);
        self.add_op(OpKind::Concat(attrs), inputs, outputs.as_ref().map(|o| &o[..]))
    }

    /// Add a broadcasting element-wise binary operator
    pub fn add_binary(&mut self, op: BinaryOp, a: Fuid, b: Fuid, output: Option<Fuid>) -> PlanResult<Guid> {
        let outputs = output.map(|o| [o]);
        self.add_op(OpKind::Binary(op), &[a, b], outputs.as_ref().map(|o| &o[..]))
    }

    /// Output tensor `index` of an operator
    pub fn output(&self, guid: Guid, index: usize) -> PlanResult<Fuid> {
        let op = self.op(guid)?;
        op.outputs().get(index).copied().ok_or_else(|| {
            PlanError::InvalidOperator(format!("operator {} has no output {}", guid, index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::OpType;
    use crate::tensor::DataType;

    #[test]
    fn test_transpose_creates_output() {
        let mut g = Graph::cpu();
        let x = g.add_tensor(&[2, 3, 4], DataType::Float16);
        let t = g.add_transpose(x, None, [2, 0, 1]).unwrap();
        let y = g.output(t, 0).unwrap();

        let ty = g.get_tensor(y).unwrap();
        assert_eq!(ty.dims(), &[4, 2, 3]);
        assert_eq!(ty.dtype(), DataType::Float16);
        assert_eq!(ty.source(), Some(t));
    }

    #[test]
    fn test_supplied_output_must_match() {
        let mut g = Graph::cpu();
        let a = g.add_tensor(&[2, 3], DataType::Float32);
        let b = g.add_tensor(&[3, 5], DataType::Float32);
        let good = g.add_tensor(&[2, 5], DataType::Float32);
        let bad = g.add_tensor(&[5, 2], DataType::Float32);

        assert_eq!(
            g.add_matmul(a, b, Some(bad), false, false),
            Err(PlanError::ShapeMismatch {
                tensor: bad,
                expected: vec![2, 5],
                actual: vec![5, 2],
            })
        );
        let mm = g.add_matmul(a, b, Some(good), false, false).unwrap();
        assert_eq!(g.output(mm, 0).unwrap(), good);
        assert_eq!(g.op_count(), 1);
    }

    #[test]
    fn test_matmul_transposed_operands() {
        let mut g = Graph::cpu();
        let a = g.add_tensor(&[8, 3, 2], DataType::Float32);
        let b = g.add_tensor(&[8, 5, 3], DataType::Float32);
        let mm = g.add_matmul(a, b, None, true, true).unwrap();
        let c = g.output(mm, 0).unwrap();
        assert_eq!(g.get_tensor(c).unwrap().dims(), &[8, 2, 5]);
    }

    #[test]
    fn test_concat_negative_axis() {
        let mut g = Graph::cpu();
        let a = g.add_tensor(&[1, 3, 2, 4], DataType::Float32);
        let b = g.add_tensor(&[1, 3, 2, 5], DataType::Float32);
        let c = g.add_concat(&[a, b], None, -1).unwrap();
        let y = g.output(c, 0).unwrap();
        assert_eq!(g.get_tensor(y).unwrap().dims(), &[1, 3, 2, 9]);
        assert_eq!(g.find_ops_by_kind(OpType::Concat), vec![c]);
    }

    #[test]
    fn test_invalid_inputs_leave_graph_untouched() {
        let mut g = Graph::cpu();
        let a = g.add_tensor(&[2, 3], DataType::Float32);
        let b = g.add_tensor(&[4], DataType::Float32);

        assert!(g.add_binary(BinaryOp::Add, a, b, None).is_err());
        assert!(g.add_transpose(a, None, [0, 0]).is_err());
        assert!(g.add_transpose(a, None, [0, 1, 2]).is_err());
        assert!(g.add_concat(&[], None, 0).is_err());
        assert!(g.add_concat(&[a], None, 2).is_err());
        assert_eq!(g.op_count(), 0);
        assert_eq!(g.tensor_count(), 2);
    }

    #[test]
    fn test_missing_input() {
        let mut g = Graph::cpu();
        let stray = Fuid::fresh();
        assert_eq!(
            g.add_binary(BinaryOp::Mul, stray, stray, None),
            Err(PlanError::TensorNotFound(stray))
        );
    }
}
