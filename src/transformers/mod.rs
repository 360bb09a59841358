//! Graph rewrite transformers
//!
//! This module provides the ready-to-use rewrites:
//!
//! - **Shape**: cancel inverse Transpose pairs
//! - **Fusion**: fold last-two-axes Transposes into MatMul flags
//!
//! # Overview
//!
//! Each transformer implements the [`GraphTransformer`] trait and can be
//! applied individually or combined.
//!
//! # Example
//!
//! ```
//! use tensor_planner::graph::Graph;
//! use tensor_planner::ops::BinaryOp;
//! use tensor_planner::tensor::DataType;
//! use tensor_planner::transformers::{CancelInverseTranspose, GraphTransformer};
//!
//! let mut g = Graph::cpu();
//! let x = g.add_tensor(&[2, 3, 4], DataType::Float32);
//! let t1 = g.add_transpose(x, None, [0, 2, 1]).unwrap();
//! let y1 = g.output(t1, 0).unwrap();
//! let t2 = g.add_transpose(y1, None, [0, 2, 1]).unwrap();
//! let y2 = g.output(t2, 0).unwrap();
//! g.add_binary(BinaryOp::Add, y2, x, None).unwrap();
//!
//! let result = CancelInverseTranspose::new().transform(&mut g).unwrap();
//! assert_eq!(result.operators_eliminated, 2);
//! ```
//!
//! # Using OptimizationPipeline
//!
//! For convenience, use [`OptimizationPipeline`] (or [`Graph::optimize`]) to
//! run every rewrite interleaved until nothing changes:
//!
//! ```ignore
//! let result = OptimizationPipeline::default().run(&mut graph)?;
//! ```

/// Common types
pub mod common;
/// Transpose + MatMul fusion
pub mod fuse_matmul;
/// Transpose chain optimization
pub mod optimize_transpose;

pub use common::{run_transformers, GraphTransformer, TransformResult};
pub use fuse_matmul::FuseTransposeMatMul;
pub use optimize_transpose::CancelInverseTranspose;

use tracing::info;

use crate::error::PlanResult;
use crate::graph::Graph;
use crate::transform::{TransformConfig, TransformEngine};

/// Optimization pipeline selecting which rewrites run
#[derive(Debug, Clone)]
pub struct OptimizationPipeline {
    /// Enable inverse Transpose cancellation
    pub cancel_inverse_transpose: bool,
    /// Enable Transpose + MatMul fusion
    pub fuse_transpose_matmul: bool,
    /// Engine configuration
    pub config: TransformConfig,
}

impl Default for OptimizationPipeline {
    fn default() -> Self {
        Self {
            cancel_inverse_transpose: true,
            fuse_transpose_matmul: true,
            config: TransformConfig::default(),
        }
    }
}

impl OptimizationPipeline {
    /// Create a new pipeline with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable only Transpose cancellation
    pub fn transpose_only() -> Self {
        Self {
            fuse_transpose_matmul: false,
            ..Self::default()
        }
    }

    /// Enable only MatMul fusion
    pub fn fuse_only() -> Self {
        Self {
            cancel_inverse_transpose: false,
            ..Self::default()
        }
    }

    /// Replace the engine configuration
    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the enabled rewrites to a fixed point
    pub fn run(&self, graph: &mut Graph) -> PlanResult<TransformResult> {
        let cancel = CancelInverseTranspose::new();
        let fuse = FuseTransposeMatMul::new();

        let mut transformers: Vec<&dyn GraphTransformer> = Vec::new();
        if self.cancel_inverse_transpose {
            transformers.push(&cancel);
        }
        if self.fuse_transpose_matmul {
            transformers.push(&fuse);
        }

        let ops_before = graph.op_count();
        let mut engine = TransformEngine::new(graph).with_config(self.config.clone());
        let result = engine.run(&transformers)?;
        let rounds = engine.stats().rounds;

        info!(
            rounds,
            ops_before,
            ops_after = graph.op_count(),
            applied = result.transforms_applied,
            "graph optimized"
        );
        Ok(result)
    }
}

impl Graph {
    /// Run every rewrite to a fixed point with default settings
    pub fn optimize(&mut self) -> PlanResult<TransformResult> {
        OptimizationPipeline::default().run(self)
    }
}
