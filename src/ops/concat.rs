//! Concatenation along one axis

use std::fmt;

use crate::error::PlanResult;
use crate::tensor::{normalize_axis, Shape, Tensor};
use crate::traits::InferShape;

/// Attributes of a Concat operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatAttrs {
    axis: usize,
}

impl ConcatAttrs {
    /// Create from a possibly negative axis for inputs of the given rank
    pub fn new(axis: i64, rank: usize) -> PlanResult<Self> {
        Ok(Self {
            axis: normalize_axis(axis, rank)?,
        })
    }

    /// Normalized concatenation axis
    pub fn axis(&self) -> usize {
        self.axis
    }
}

impl InferShape for ConcatAttrs {
    fn infer_shape(&self, inputs: &[&Tensor]) -> Option<Vec<Shape>> {
        let (first, rest) = inputs.split_first()?;
        let mut dims = Shape::from_slice(first.dims());
        if first.rank() == 0 {
            // scalars cannot be concatenated
            return None;
        }
        if self.axis >= dims.len() {
            return None;
        }

        for input in rest {
            if input.rank() != dims.len() {
                return None;
            }
            for (j, (&have, &got)) in dims.iter().zip(input.dims()).enumerate() {
                if j != self.axis && have != got {
                    return None;
                }
            }
            dims[self.axis] += input.dims()[self.axis];
        }

        Some(vec![dims])
    }
}

impl fmt::Display for ConcatAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dim={}", self.axis)
    }
}
