//! Graph IR
//!
//! This module provides the dataflow graph that the rewrite engine and the
//! memory planner operate on:
//!
//! - [`Graph`]: owns tensors, operators, the execution order and the arena
//! - [`maps`]: id types and the ordered tables backing the graph
//!
//! # Example
//!
//! ```
//! use tensor_planner::graph::Graph;
//! use tensor_planner::tensor::DataType;
//!
//! let mut g = Graph::cpu();
//! let x = g.add_tensor(&[2, 3, 4], DataType::Float32);
//! let t = g.add_transpose(x, None, [0, 2, 1]).unwrap();
//! let y = g.output(t, 0).unwrap();
//!
//! g.shape_infer().unwrap();
//! assert_eq!(g.get_tensor(y).unwrap().dims(), &[2, 4, 3]);
//! assert!(g.check_valid().is_valid);
//! ```
//!
//! # Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `tensors` | fuid → Tensor (insertion order) |
//! | `ops` | guid → OpEntry (execution order) |
//!
//! Edges are stored on both sides: a tensor knows its source and targets,
//! an operator knows its inputs, outputs, predecessors and successors.
//! Only the mutators in this module update them, always in pairs.

pub mod accessors;
pub mod builder;
pub mod context;
pub mod maps;
pub mod memory;
pub mod mutators;
pub mod sort;
pub mod validation;

pub use context::{Graph, GraphConfig, PlanStrategy};
pub use maps::{Fuid, FxIndexMap, FxIndexSet, Guid, OpEntry, OperatorMap, TensorMap};
pub use validation::ValidationResult;
