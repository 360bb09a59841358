//! Core traits for tensor-planner
//!
//! Defines the shape contract every operator kind fulfils.

use crate::tensor::{Shape, Tensor};

/// Shape inference contract for operator kinds
///
/// Implementations are pure: they look at the input tensors' shapes and
/// return one shape per output, or `None` when the inputs are incompatible
/// with the operator's attributes.
///
/// # Example
///
/// ```ignore
/// struct Identity;
///
/// impl InferShape for Identity {
///     fn infer_shape(&self, inputs: &[&Tensor]) -> Option<Vec<Shape>> {
///         Some(vec![Shape::from_slice(inputs.first()?.dims())])
///     }
/// }
/// ```
pub trait InferShape {
    /// Compute output shapes from input tensors
    ///
    /// # Arguments
    /// * `inputs` - The operator's inputs, in order
    ///
    /// # Returns
    /// * `Option<Vec<Shape>>` - One shape per output, `None` if incompatible
    fn infer_shape(&self, inputs: &[&Tensor]) -> Option<Vec<Shape>>;

    /// Number of outputs the operator produces
    fn num_outputs(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::DataType;

    struct Identity;

    impl InferShape for Identity {
        fn infer_shape(&self, inputs: &[&Tensor]) -> Option<Vec<Shape>> {
            Some(vec![Shape::from_slice(inputs.first()?.dims())])
        }
    }

    #[test]
    fn test_identity_shape() {
        let t = Tensor::new(&[2, 3], DataType::Float32);
        let shapes = Identity.infer_shape(&[&t]).unwrap();
        assert_eq!(shapes.len(), Identity.num_outputs());
        assert_eq!(shapes[0].as_slice(), &[2, 3]);
    }

    #[test]
    fn test_identity_no_inputs() {
        assert!(Identity.infer_shape(&[]).is_none());
    }
}
