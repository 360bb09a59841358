//! Graph id and table types
//!
//! Defines the core data structures for efficient graph traversal.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;

use crate::ops::Operator;
use crate::tensor::Tensor;

/// Insertion-ordered map with Fx hashing
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Insertion-ordered set with Fx hashing
pub type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

static NEXT_FUID: AtomicUsize = AtomicUsize::new(1);
static NEXT_GUID: AtomicUsize = AtomicUsize::new(1);

/// Tensor id, stable across graph rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fuid(usize);

impl Fuid {
    /// Allocate a process-wide unique id
    pub fn fresh() -> Self {
        Self(NEXT_FUID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id; ids made this way are not checked for uniqueness
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Underlying integer
    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for Fuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operator id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(usize);

impl Guid {
    /// Allocate a process-wide unique id
    pub fn fresh() -> Self {
        Self(NEXT_GUID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id; ids made this way are not checked for uniqueness
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Underlying integer
    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry in the operator table - tracks the operator and its state
#[derive(Debug, Clone)]
pub struct OpEntry {
    /// The operator itself
    pub op: Operator,
    /// Whether a rewrite retired this operator; dropped at the next compaction
    pub eliminated: bool,
}

impl OpEntry {
    /// Create a new entry with the given operator
    pub fn new(op: Operator) -> Self {
        Self {
            op,
            eliminated: false,
        }
    }

    /// Mark this operator for elimination
    pub fn mark_eliminated(&mut self) {
        self.eliminated = true;
    }
}

/// Tensor table: fuid → tensor (insertion order is the allocation order)
pub type TensorMap = FxIndexMap<Fuid, Tensor>;

/// Operator table: guid → entry (order is the execution sequence)
pub type OperatorMap = FxIndexMap<Guid, OpEntry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{OpKind, TransposeAttrs};

    #[test]
    fn test_fresh_ids_increase() {
        let a = Guid::fresh();
        let b = Guid::fresh();
        assert!(b > a);

        let x = Fuid::fresh();
        let y = Fuid::fresh();
        assert!(y > x);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(Fuid::from_raw(12).to_string(), "12");
        assert_eq!(Guid::from_raw(3).to_string(), "3");
    }

    #[test]
    fn test_op_entry_elimination() {
        let op = Operator::new(
            OpKind::Transpose(TransposeAttrs::new(vec![1, 0])),
            vec![Fuid::fresh()],
            vec![Fuid::fresh()],
        );
        let mut entry = OpEntry::new(op);
        assert!(!entry.eliminated);
        entry.mark_eliminated();
        assert!(entry.eliminated);
    }

    #[test]
    fn test_operator_map_preserves_order() {
        let mut map = OperatorMap::default();
        let mut guids = Vec::new();
        for _ in 0..3 {
            let op = Operator::new(
                OpKind::Transpose(TransposeAttrs::new(vec![0])),
                vec![Fuid::fresh()],
                vec![Fuid::fresh()],
            );
            guids.push(op.guid());
            map.insert(op.guid(), OpEntry::new(op));
        }
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, guids);
    }
}
