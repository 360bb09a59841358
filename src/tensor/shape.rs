//! Shape utilities
//!
//! Functions for working with tensor shapes and dimensions.

use smallvec::SmallVec;

use crate::error::{PlanError, PlanResult};

/// Ordered dimension sizes; rank <= 4 stays inline
pub type Shape = SmallVec<[usize; 4]>;

/// Calculate total number of elements from shape
pub fn numel(shape: &[usize]) -> usize {
    // empty shape is a scalar, product of nothing is 1
    shape.iter().product()
}

/// Element count, `None` if the product overflows
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Check if two shapes are broadcastable
pub fn is_broadcastable(shape_a: &[usize], shape_b: &[usize]) -> bool {
    broadcast_shape(shape_a, shape_b).is_some()
}

/// Compute the bidirectional broadcast of two shapes
///
/// Dimensions are aligned from the trailing axis; a dimension of 1 stretches
/// to match its counterpart. Returns `None` if any aligned pair differs and
/// neither side is 1.
pub fn broadcast_shape(shape_a: &[usize], shape_b: &[usize]) -> Option<Shape> {
    let max_len = shape_a.len().max(shape_b.len());
    let mut result: Shape = smallvec::smallvec![0; max_len];

    for i in 0..max_len {
        let dim_a = trailing_dim(shape_a, i);
        let dim_b = trailing_dim(shape_b, i);

        if dim_a != dim_b && dim_a != 1 && dim_b != 1 {
            return None;
        }
        result[max_len - 1 - i] = dim_a.max(dim_b);
    }

    Some(result)
}

fn trailing_dim(shape: &[usize], i: usize) -> usize {
    if i < shape.len() {
        shape[shape.len() - 1 - i]
    } else {
        1
    }
}

/// Normalize a possibly negative axis to a positive index
///
/// A rank-0 tensor accepts only axis 0 (or -1) and maps it to 0.
pub fn normalize_axis(axis: i64, ndim: usize) -> PlanResult<usize> {
    if ndim == 0 {
        return match axis {
            0 | -1 => Ok(0),
            _ => Err(PlanError::InvalidOperator(format!(
                "Axis {} out of bounds for scalar",
                axis
            ))),
        };
    }

    let ndim_i64 = ndim as i64;
    let normalized = if axis < 0 { axis + ndim_i64 } else { axis };

    if normalized < 0 || normalized >= ndim_i64 {
        return Err(PlanError::InvalidOperator(format!(
            "Axis {} out of bounds for ndim {}",
            axis, ndim
        )));
    }

    Ok(normalized as usize)
}
