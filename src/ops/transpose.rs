//! Transpose (axis permutation)

use std::fmt;

use smallvec::SmallVec;

use crate::tensor::{Shape, Tensor};
use crate::traits::InferShape;

/// Permutation list; `output.dims[j] == input.dims[perm[j]]`
pub type Permutation = SmallVec<[usize; 4]>;

/// Attributes of a Transpose operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransposeAttrs {
    perm: Permutation,
}

impl TransposeAttrs {
    /// Create from a permutation list
    pub fn new(perm: impl IntoIterator<Item = usize>) -> Self {
        Self {
            perm: perm.into_iter().collect(),
        }
    }

    /// Permutation list
    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    /// Check that the list is a permutation of `0..perm.len()`
    pub fn is_permutation(&self) -> bool {
        let mut seen: SmallVec<[bool; 8]> = smallvec::smallvec![false; self.perm.len()];
        for &p in &self.perm {
            match seen.get_mut(p) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }

    /// Whether applying `self` then `next` restores the original layout
    ///
    /// Holds iff `next.perm[self.perm[j]] == j` for every position `j`.
    pub fn cancels_with(&self, next: &TransposeAttrs) -> bool {
        self.perm.len() == next.perm.len()
            && self
                .perm
                .iter()
                .enumerate()
                .all(|(j, &p)| next.perm.get(p) == Some(&j))
    }

    /// Whether this permutation swaps the last two axes and fixes the rest
    pub fn swaps_last_two(&self) -> bool {
        let rank = self.perm.len();
        if rank < 2 {
            return false;
        }
        self.perm[..rank - 2]
            .iter()
            .enumerate()
            .all(|(i, &p)| p == i)
            && self.perm[rank - 2] == rank - 1
            && self.perm[rank - 1] == rank - 2
    }
}

impl InferShape for TransposeAttrs {
    fn infer_shape(&self, inputs: &[&Tensor]) -> Option<Vec<Shape>> {
        let [input] = inputs else {
            return None;
        };
        let dims = input.dims();
        if dims.len() != self.perm.len() || !self.is_permutation() {
            return None;
        }
        let out: Shape = self.perm.iter().map(|&p| dims[p]).collect();
        Some(vec![out])
    }
}

impl fmt::Display for TransposeAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "perm={:?}", self.perm.as_slice())
    }
}
