//! Operator kinds
//!
//! A closed set of operator kinds, each carrying its own attribute payload:
//!
//! - [`TransposeAttrs`]: axis permutation
//! - [`MatMulAttrs`]: batched matmul with `trans_a` / `trans_b`
//! - [`ConcatAttrs`]: concatenation along one axis
//! - [`BinaryOp`]: broadcasting element-wise arithmetic
//!
//! Every kind exposes the same capabilities through [`OpKind`]: shape
//! inference and a textual description.

pub mod concat;
pub mod elementwise;
pub mod matmul;
pub mod transpose;

use std::fmt;

use smallvec::SmallVec;

pub use concat::ConcatAttrs;
pub use elementwise::BinaryOp;
pub use matmul::{MatMulAttrs, Mnk};
pub use transpose::{Permutation, TransposeAttrs};

use crate::graph::{Fuid, FxIndexSet, Guid};
use crate::tensor::{Shape, Tensor};
use crate::traits::InferShape;

/// Ordered tensor references of an operator
pub type TensorVec = SmallVec<[Fuid; 4]>;

/// Operator kind tag without attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    /// Axis permutation
    Transpose,
    /// Matrix multiplication
    MatMul,
    /// Concatenation
    Concat,
    /// Element-wise binary arithmetic
    Binary,
}

/// Operator kind with its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    /// Axis permutation
    Transpose(TransposeAttrs),
    /// Matrix multiplication
    MatMul(MatMulAttrs),
    /// Concatenation
    Concat(ConcatAttrs),
    /// Element-wise binary arithmetic
    Binary(BinaryOp),
}

impl OpKind {
    /// Attribute-free tag
    pub fn op_type(&self) -> OpType {
        match self {
            OpKind::Transpose(_) => OpType::Transpose,
            OpKind::MatMul(_) => OpType::MatMul,
            OpKind::Concat(_) => OpType::Concat,
            OpKind::Binary(_) => OpType::Binary,
        }
    }

    /// Transpose attributes, if this is a Transpose
    pub fn as_transpose(&self) -> Option<&TransposeAttrs> {
        match self {
            OpKind::Transpose(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// MatMul attributes, if this is a MatMul
    pub fn as_matmul(&self) -> Option<&MatMulAttrs> {
        match self {
            OpKind::MatMul(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Mutable MatMul attributes, if this is a MatMul
    pub fn as_matmul_mut(&mut self) -> Option<&mut MatMulAttrs> {
        match self {
            OpKind::MatMul(attrs) => Some(attrs),
            _ => None,
        }
    }
}

impl InferShape for OpKind {
    fn infer_shape(&self, inputs: &[&Tensor]) -> Option<Vec<Shape>> {
        match self {
            OpKind::Transpose(attrs) => attrs.infer_shape(inputs),
            OpKind::MatMul(attrs) => attrs.infer_shape(inputs),
            OpKind::Concat(attrs) => attrs.infer_shape(inputs),
            OpKind::Binary(op) => op.infer_shape(inputs),
        }
    }

    fn num_outputs(&self) -> usize {
        match self {
            OpKind::Transpose(attrs) => attrs.num_outputs(),
            OpKind::MatMul(attrs) => attrs.num_outputs(),
            OpKind::Concat(attrs) => attrs.num_outputs(),
            OpKind::Binary(op) => op.num_outputs(),
        }
    }
}

/// Computation node of the graph
///
/// Inputs and outputs reference tensors by id. Predecessor and successor
/// sets are derived by the graph from the tensor links and must never be
/// edited independently of them.
#[derive(Debug, Clone)]
pub struct Operator {
    guid: Guid,
    kind: OpKind,
    inputs: TensorVec,
    outputs: TensorVec,
    predecessors: FxIndexSet<Guid>,
    successors: FxIndexSet<Guid>,
}

impl Operator {
    /// Create an unconnected operator with a fresh id
    pub fn new(
        kind: OpKind,
        inputs: impl IntoIterator<Item = Fuid>,
        outputs: impl IntoIterator<Item = Fuid>,
    ) -> Self {
        Self {
            guid: Guid::fresh(),
            kind,
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
            predecessors: FxIndexSet::default(),
            successors: FxIndexSet::default(),
        }
    }

    /// Operator id
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Kind and attributes
    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    /// Attribute-free tag
    pub fn op_type(&self) -> OpType {
        self.kind.op_type()
    }

    /// Input tensors, in order
    pub fn inputs(&self) -> &[Fuid] {
        &self.inputs
    }

    /// Output tensors, in order
    pub fn outputs(&self) -> &[Fuid] {
        &self.outputs
    }

    /// Operators producing this operator's inputs
    pub fn predecessors(&self) -> &FxIndexSet<Guid> {
        &self.predecessors
    }

    /// Operators consuming this operator's outputs
    pub fn successors(&self) -> &FxIndexSet<Guid> {
        &self.successors
    }

    pub(crate) fn kind_mut(&mut self) -> &mut OpKind {
        &mut self.kind
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut TensorVec {
        &mut self.inputs
    }

    pub(crate) fn add_predecessor(&mut self, op: Guid) {
        self.predecessors.insert(op);
    }

    pub(crate) fn remove_predecessor(&mut self, op: Guid) -> bool {
        self.predecessors.shift_remove(&op)
    }

    pub(crate) fn add_successor(&mut self, op: Guid) {
        self.successors.insert(op);
    }

    pub(crate) fn remove_successor(&mut self, op: Guid) -> bool {
        self.successors.shift_remove(&op)
    }

    pub(crate) fn clear_links(&mut self) {
        self.predecessors.clear();
        self.successors.clear();
    }
}

fn join_ids(ids: &[Fuid]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs = join_ids(&self.inputs);
        let outputs = join_ids(&self.outputs);
        match &self.kind {
            OpKind::Transpose(attrs) => write!(
                f,
                "Transpose[{}](input={},output={},{})",
                self.guid, inputs, outputs, attrs
            ),
            OpKind::MatMul(attrs) => {
                let a = self.inputs.first().map(|t| t.to_string()).unwrap_or_default();
                let b = self.inputs.get(1).map(|t| t.to_string()).unwrap_or_default();
                write!(
                    f,
                    "Matmul[{}]({},A={},B={},C={})",
                    self.guid, attrs, a, b, outputs
                )
            }
            OpKind::Concat(attrs) => write!(
                f,
                "Concat[{}]({},input={},output={})",
                self.guid, attrs, inputs, outputs
            ),
            OpKind::Binary(op) => write!(
                f,
                "{}[{}](input={},output={})",
                op, self.guid, inputs, outputs
            ),
        }
    }
}
