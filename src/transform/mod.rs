//! Graph transformation module
//!
//! This module provides the rewrite infrastructure the transformers build on:
//!
//! - [`TransformEngine`]: fixed-point loop over the operator sequence
//! - [`fuse`]: preconditions for folding one operator into another
//! - [`eliminate`]: operator retirement and orphan cleanup
//! - [`bridge`]: moving consumers onto another tensor
//!
//! # Overview
//!
//! Transformations work on a [`Graph`](crate::graph::Graph) in place. A
//! rewrite typically:
//!
//! 1. checks its precondition with [`can_fuse`]
//! 2. rewires consumers with [`bridge_consumers`] or
//!    [`Graph::replace_input`](crate::graph::Graph::replace_input)
//! 3. retires the dead operators with [`eliminate_operator`]
//!
//! # Example
//!
//! ```
//! use tensor_planner::graph::Graph;
//! use tensor_planner::ops::BinaryOp;
//! use tensor_planner::tensor::DataType;
//! use tensor_planner::transform::{bridge_consumers, eliminate_operator};
//!
//! let mut g = Graph::cpu();
//! let x = g.add_tensor(&[4], DataType::Float32);
//! let t = g.add_transpose(x, None, [0]).unwrap();
//! let y = g.output(t, 0).unwrap();
//! g.add_binary(BinaryOp::Add, y, x, None).unwrap();
//!
//! bridge_consumers(&mut g, y, x).unwrap();
//! eliminate_operator(&mut g, t).unwrap();
//! g.compact();
//! assert_eq!(g.op_count(), 1);
//! assert!(g.check_valid().is_valid);
//! ```

pub mod bridge;
pub mod core;
pub mod eliminate;
pub mod fuse;

pub use bridge::bridge_consumers;
pub use self::core::{TransformConfig, TransformEngine, TransformStats};
pub use eliminate::{drop_orphan_tensor, eliminate_operator, EliminationResult};
pub use fuse::{can_fuse, fused_slot};
