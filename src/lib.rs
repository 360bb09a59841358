//! # Tensor Planner
//!
//! Dataflow-graph IR for tensor programs with a rewrite engine and a static
//! memory planner.
//!
//! This crate builds a graph of tensors and operators, simplifies it with
//! local rewrites, orders and shape-checks it, and lays every tensor out in
//! a single arena buffer sized exactly to the planned peak.
//!
//! ## Features
//!
//! - **Graph IR**: typed operators, derived producer/consumer edges,
//!   topological ordering, shape propagation, invariant auditing
//! - **Rewrites**: inverse Transpose cancellation, Transpose + MatMul fusion
//! - **Memory planning**: first-fit arena with coalescing, one lazy buffer
//!   request per graph, static or liveness-based layout
//!
//! ## Example
//!
//! ```
//! use tensor_planner::prelude::*;
//!
//! let mut g = Graph::cpu();
//! let x = g.add_tensor(&[2, 3, 4], DataType::Float32);
//! let t1 = g.add_transpose(x, None, [0, 2, 1]).unwrap();
//! let y1 = g.output(t1, 0).unwrap();
//! let t2 = g.add_transpose(y1, None, [0, 2, 1]).unwrap();
//! let y2 = g.output(t2, 0).unwrap();
//! g.add_binary(BinaryOp::Add, y2, x, None).unwrap();
//!
//! g.optimize().unwrap();
//! g.shape_infer().unwrap();
//! g.data_malloc().unwrap();
//! assert_eq!(g.op_count(), 1);
//! assert_eq!(g.allocator().peak(), 2 * 24 * 4);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// ============================================================================
// Module declarations
// ============================================================================

pub mod allocator;
pub mod error;
pub mod graph;
pub mod ops;
pub mod tensor;
pub mod traits;
pub mod transform;
pub mod transformers;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module - import commonly used types with `use tensor_planner::prelude::*`
pub mod prelude {
    pub use crate::allocator::{Allocator, CpuRuntime, Runtime};
    pub use crate::error::{PlanError, PlanResult};
    pub use crate::graph::{Fuid, Graph, GraphConfig, Guid, PlanStrategy};
    pub use crate::ops::{BinaryOp, OpKind, OpType, Operator};
    pub use crate::tensor::{DataType, Tensor};
    pub use crate::traits::InferShape;
    pub use crate::transform::{TransformConfig, TransformEngine};
    pub use crate::transformers::{GraphTransformer, OptimizationPipeline, TransformResult};
}

// ============================================================================
// Crate-level re-exports
// ============================================================================

pub use error::{PlanError, PlanResult};
pub use graph::Graph;
pub use traits::InferShape;

// ============================================================================
// Version information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
