//! Error types for tensor-planner
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::graph::{Fuid, Guid};

/// Main error type for graph construction, rewriting and memory planning
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Structural invariant violated
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Tensor is not a member of the graph
    #[error("Tensor not found: {0}")]
    TensorNotFound(Fuid),

    /// Operator is not a member of the graph
    #[error("Operator not found: {0}")]
    OperatorNotFound(Guid),

    /// Operator attributes do not fit its inputs
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    /// Shape function rejected the operator's inputs
    #[error("Shape inference failed for operator {op}: {reason}")]
    ShapeInference {
        /// Responsible operator
        op: Guid,
        /// Human readable cause
        reason: String,
    },

    /// Shape function returned the wrong number of outputs
    #[error("Operator {op} inferred {actual} output shapes, expected {expected}")]
    OutputArity {
        /// Responsible operator
        op: Guid,
        /// Number of output tensors attached to the operator
        expected: usize,
        /// Number of shapes returned by the shape function
        actual: usize,
    },

    /// Supplied output tensor disagrees with the inferred shape
    #[error("Shape mismatch for tensor {tensor}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Offending tensor
        tensor: Fuid,
        /// Inferred shape
        expected: Vec<usize>,
        /// Shape carried by the tensor
        actual: Vec<usize>,
    },

    /// Topological sort made no progress
    #[error("Graph is not sortable: {remaining} operators form a cycle or depend on missing producers")]
    Unsortable {
        /// Operators left unplaced
        remaining: usize,
    },

    /// Allocator already handed out its buffer
    #[error("Allocator is sealed: the arena buffer has already been materialized")]
    AllocatorSealed,

    /// Freed range is not a live allocation
    #[error("Invalid free of {size} bytes at offset {addr}")]
    InvalidFree {
        /// Offset passed to free
        addr: usize,
        /// Aligned size passed to free
        size: usize,
    },

    /// Byte size does not fit in `usize`
    #[error("Size overflow: {0}")]
    SizeOverflow(String),

    /// Tensor already has memory bound to it
    #[error("Tensor {0} is already bound to memory")]
    AlreadyBound(Fuid),

    /// Backend runtime could not provide the buffer
    #[error("Runtime allocation failed: {0}")]
    RuntimeAlloc(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for planner operations
pub type PlanResult<T> = Result<T, PlanError>;
