//! Broadcasting element-wise binary operators

use std::fmt;

use crate::tensor::{broadcast_shape, Shape, Tensor};
use crate::traits::InferShape;

/// Element-wise binary operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// a + b
    Add,
    /// a - b
    Sub,
    /// a * b
    Mul,
    /// a / b
    Div,
}

impl BinaryOp {
    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "Add",
            BinaryOp::Sub => "Sub",
            BinaryOp::Mul => "Mul",
            BinaryOp::Div => "Div",
        }
    }
}

impl InferShape for BinaryOp {
    fn infer_shape(&self, inputs: &[&Tensor]) -> Option<Vec<Shape>> {
        let [a, b] = inputs else {
            return None;
        };
        Some(vec![broadcast_shape(a.dims(), b.dims())?])
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::DataType;

    #[test]
    fn test_broadcast_add() {
        let a = Tensor::new(&[2, 1, 4], DataType::Float32);
        let b = Tensor::new(&[3, 1], DataType::Float32);
        let out = BinaryOp::Add.infer_shape(&[&a, &b]).unwrap();
        assert_eq!(out[0].as_slice(), &[2, 3, 4]);
    }

    #[test]
    fn test_incompatible() {
        let a = Tensor::new(&[2, 3], DataType::Float32);
        let b = Tensor::new(&[4], DataType::Float32);
        assert!(BinaryOp::Mul.infer_shape(&[&a, &b]).is_none());
    }

    #[test]
    fn test_arity() {
        let a = Tensor::new(&[2], DataType::Float32);
        assert!(BinaryOp::Sub.infer_shape(&[&a]).is_none());
    }
}
