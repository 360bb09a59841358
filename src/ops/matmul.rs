//! Batched matrix multiplication with transpose flags

use std::fmt;

use crate::tensor::{Shape, Tensor};
use crate::traits::InferShape;

/// Attributes of a MatMul operator
///
/// `C = op(A) · op(B)` where `op` transposes the last two axes when the
/// matching flag is set. Leading axes are batch axes and broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatMulAttrs {
    /// Transpose the last two axes of A
    pub trans_a: bool,
    /// Transpose the last two axes of B
    pub trans_b: bool,
}

/// Problem size of a matrix multiplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mnk {
    /// Rows of the result
    pub m: usize,
    /// Columns of the result
    pub n: usize,
    /// Reduction length
    pub k: usize,
}

impl MatMulAttrs {
    /// Create with explicit flags
    pub fn new(trans_a: bool, trans_b: bool) -> Self {
        Self { trans_a, trans_b }
    }

    /// Flip `trans_a`
    pub fn toggle_trans_a(&mut self) {
        self.trans_a = !self.trans_a;
    }

    /// Flip `trans_b`
    pub fn toggle_trans_b(&mut self) {
        self.trans_b = !self.trans_b;
    }

    /// Flip the flag for input slot 0 (A) or 1 (B)
    pub fn toggle_trans(&mut self, slot: usize) -> bool {
        match slot {
            0 => self.toggle_trans_a(),
            1 => self.toggle_trans_b(),
            _ => return false,
        }
        true
    }

    /// Resolve m, n, k from operand shapes, honouring the flags
    pub fn mnk(&self, a: &[usize], b: &[usize]) -> Option<Mnk> {
        let rank = a.len();
        if rank < 2 || b.len() != rank {
            return None;
        }
        let (a_rows, a_cols) = (a[rank - 2], a[rank - 1]);
        let (b_rows, b_cols) = (b[rank - 2], b[rank - 1]);

        let (m, k) = if self.trans_a {
            (a_cols, a_rows)
        } else {
            (a_rows, a_cols)
        };
        let (k_b, n) = if self.trans_b {
            (b_cols, b_rows)
        } else {
            (b_rows, b_cols)
        };

        (k == k_b).then_some(Mnk { m, n, k })
    }
}

impl InferShape for MatMulAttrs {
    fn infer_shape(&self, inputs: &[&Tensor]) -> Option<Vec<Shape>> {
        let [a, b] = inputs else {
            return None;
        };
        let (a, b) = (a.dims(), b.dims());
        let Mnk { m, n, .. } = self.mnk(a, b)?;

        let rank = a.len();
        let mut out = Shape::with_capacity(rank);
        for (&da, &db) in a[..rank - 2].iter().zip(&b[..rank - 2]) {
            if da != db && da != 1 && db != 1 {
                return None;
            }
            out.push(da.max(db));
        }
        out.push(m);
        out.push(n);
        Some(vec![out])
    }
}

impl fmt::Display for MatMulAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}]",
            if self.trans_a { "A^T" } else { "A" },
            if self.trans_b { "B^T" } else { "B" }
        )
    }
}
