//! Tensors and tensor utilities
//!
//! This module provides the data node of the graph and its helpers:
//! - [`Tensor`]: shaped, typed value with one producer and many consumers
//! - Data type mappings (`dtype`)
//! - Shape utilities (`shape`)
//!
//! # Example
//!
//! ```ignore
//! use tensor_planner::tensor::{broadcast_shape, DataType};
//!
//! let out = broadcast_shape(&[2, 1, 4], &[3, 1]).unwrap();
//! assert_eq!(out.as_slice(), &[2, 3, 4]);
//! assert_eq!(DataType::Float32.size(), 4);
//! ```

pub mod dtype;
pub mod shape;

use std::fmt;

// Re-export commonly used items
pub use dtype::{DataType, MAX_DTYPE_SIZE};
pub use shape::{broadcast_shape, checked_numel, is_broadcastable, normalize_axis, numel, Shape};

use crate::error::{PlanError, PlanResult};
use crate::graph::{Fuid, FxIndexSet, Guid};

/// Memory bound to a tensor: a byte range inside the planned arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlob {
    /// Byte offset from the arena base
    pub offset: usize,
    /// Number of bytes the tensor occupies
    pub len: usize,
}

/// Data node of the graph
///
/// Edges are stored by id; the graph is the single owner of every tensor and
/// operator, so removing a node is a table update.
#[derive(Debug, Clone)]
pub struct Tensor {
    fuid: Fuid,
    shape: Shape,
    dtype: DataType,
    source: Option<Guid>,
    targets: FxIndexSet<Guid>,
    data: Option<DataBlob>,
}

impl Tensor {
    /// Create an unconnected tensor with a fresh id
    pub fn new(shape: &[usize], dtype: DataType) -> Self {
        Self {
            fuid: Fuid::fresh(),
            shape: Shape::from_slice(shape),
            dtype,
            source: None,
            targets: FxIndexSet::default(),
            data: None,
        }
    }

    /// Stable tensor id
    pub fn fuid(&self) -> Fuid {
        self.fuid
    }

    /// Dimension sizes
    pub fn dims(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Element type
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    /// Size of the tensor's data in bytes
    pub fn bytes(&self) -> PlanResult<usize> {
        checked_numel(&self.shape)
            .and_then(|n| n.checked_mul(self.dtype.size()))
            .ok_or_else(|| {
                PlanError::SizeOverflow(format!("tensor {} of shape {:?}", self.fuid, self.dims()))
            })
    }

    /// Producing operator, if any
    pub fn source(&self) -> Option<Guid> {
        self.source
    }

    /// Consuming operators
    pub fn targets(&self) -> &FxIndexSet<Guid> {
        &self.targets
    }

    /// Bound memory, once planned
    pub fn data(&self) -> Option<DataBlob> {
        self.data
    }

    /// Whether memory has been bound
    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    pub(crate) fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    pub(crate) fn set_source(&mut self, op: Option<Guid>) {
        self.source = op;
    }

    pub(crate) fn add_target(&mut self, op: Guid) {
        self.targets.insert(op);
    }

    pub(crate) fn remove_target(&mut self, op: Guid) -> bool {
        self.targets.shift_remove(&op)
    }

    pub(crate) fn bind(&mut self, blob: DataBlob) {
        self.data = Some(blob);
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor {}, shape {:?}, dtype {}",
            self.fuid,
            self.shape.as_slice(),
            self.dtype
        )?;
        match self.source {
            Some(op) => write!(f, ", source {}", op)?,
            None => f.write_str(", source None")?,
        }
        let targets: Vec<_> = self.targets.iter().map(|g| g.raw()).collect();
        write!(f, ", targets {:?}", targets)?;
        match self.data {
            Some(blob) => write!(f, ", data @{}+{}", blob.offset, blob.len),
            None => f.write_str(", data unbound"),
        }
    }
}
