//! Memory planning driver
//!
//! `data_malloc` sorts the graph, plans one arena offset per tensor through
//! the allocator, materializes the arena once at its peak size, and binds
//! every tensor to its byte range.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::error::{PlanError, PlanResult};
use crate::tensor::DataBlob;

use super::context::{Graph, PlanStrategy};
use super::maps::Fuid;

impl Graph {
    /// Plan, materialize and bind memory for every tensor
    ///
    /// Fails with [`PlanError::AlreadyBound`] if any tensor already has
    /// memory, so planning happens at most once per graph.
    pub fn data_malloc(&mut self) -> PlanResult<()> {
        self.topo_sort()?;
        if let Some(bound) = self.tensors().find(|t| t.is_bound()) {
            return Err(PlanError::AlreadyBound(bound.fuid()));
        }

        let offsets = match self.config().strategy {
            PlanStrategy::Static => self.plan_static()?,
            PlanStrategy::Liveness => self.plan_liveness()?,
        };

        let arena = self.allocator.materialize()?.size();
        for (fuid, offset) in offsets {
            let tensor = self.tensor_mut(fuid)?;
            let len = tensor.bytes()?;
            if offset.checked_add(len).map_or(true, |stop| stop > arena) {
                return Err(PlanError::Internal(format!(
                    "tensor {} planned past the arena end",
                    fuid
                )));
            }
            tensor.bind(DataBlob { offset, len });
        }

        info!(
            tensors = self.tensor_count(),
            arena,
            strategy = ?self.config().strategy,
            "memory planned"
        );
        self.allocator.info();
        Ok(())
    }

    /// One range per tensor, in table order, never released
    fn plan_static(&mut self) -> PlanResult<Vec<(Fuid, usize)>> {
        let mut offsets = Vec::with_capacity(self.tensors.len());
        for tensor in self.tensors.values() {
            let offset = self.allocator.alloc(tensor.bytes()?)?;
            offsets.push((tensor.fuid(), offset));
        }
        Ok(offsets)
    }

    /// Walk operators in execution order, releasing each intermediate once
    /// its last consumer has run
    ///
    /// Graph inputs are placed first and stay resident along with graph
    /// outputs. An operator's outputs are reserved before its inputs are
    /// released, so no output aliases an input of the same operator.
    fn plan_liveness(&mut self) -> PlanResult<Vec<(Fuid, usize)>> {
        let mut offsets: FxHashMap<Fuid, usize> = FxHashMap::default();
        let mut order: Vec<Fuid> = Vec::with_capacity(self.tensors.len());
        let mut pending: FxHashMap<Fuid, usize> = self
            .tensors
            .values()
            .map(|t| (t.fuid(), t.targets().len()))
            .collect();

        for tensor in self.tensors.values().filter(|t| t.source().is_none()) {
            offsets.insert(tensor.fuid(), self.allocator.alloc(tensor.bytes()?)?);
            order.push(tensor.fuid());
        }

        for entry in self.ops.values() {
            let op = &entry.op;
            for fuid in op.outputs() {
                let tensor = self.tensors.get(fuid).ok_or(PlanError::TensorNotFound(*fuid))?;
                if !offsets.contains_key(fuid) {
                    offsets.insert(*fuid, self.allocator.alloc(tensor.bytes()?)?);
                    order.push(*fuid);
                }
            }

            let distinct: FxHashSet<Fuid> = op.inputs().iter().copied().collect();
            for fuid in distinct {
                let tensor = self.tensors.get(&fuid).ok_or(PlanError::TensorNotFound(fuid))?;
                let Some(left) = pending.get_mut(&fuid) else {
                    continue;
                };
                *left = left.saturating_sub(1);
                if *left == 0 && tensor.source().is_some() {
                    if let Some(&offset) = offsets.get(&fuid) {
                        self.allocator.free(offset, tensor.bytes()?)?;
                        debug!(tensor = %fuid, offset, "released after last use");
                    }
                }
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|fuid| offsets.get(&fuid).map(|&offset| (fuid, offset)))
            .collect())
    }

    // ========================================================================
    // Bound memory access
    // ========================================================================

    /// Bytes bound to a tensor
    pub fn tensor_data(&self, fuid: Fuid) -> Option<&[u8]> {
        let blob = self.tensor(fuid)?.data()?;
        self.allocator
            .buffer()?
            .as_slice()
            .get(blob.offset..blob.offset + blob.len)
    }

    /// Mutable bytes bound to a tensor
    pub fn tensor_data_mut(&mut self, fuid: Fuid) -> Option<&mut [u8]> {
        let blob = self.tensors.get(&fuid)?.data()?;
        self.allocator
            .buffer_mut()?
            .as_mut_slice()
            .get_mut(blob.offset..blob.offset + blob.len)
    }

    /// Address of a tensor's memory, arena base plus its offset
    pub fn tensor_ptr(&self, fuid: Fuid) -> Option<*const u8> {
        let blob = self.tensor(fuid)?.data()?;
        Some(self.allocator.buffer()?.as_ptr().wrapping_add(blob.offset))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::allocator::tests::CountingRuntime;
    use crate::graph::GraphConfig;
    use crate::ops::BinaryOp;
    use crate::tensor::DataType;

    fn chain(strategy: PlanStrategy, runtime: Arc<CountingRuntime>) -> (Graph, Vec<Fuid>) {
        let config = GraphConfig {
            alignment: 8,
            strategy,
        };
        let mut g = Graph::with_config(runtime, config);
        let x = g.add_tensor(&[16, 16], DataType::Float32);
        let mut fuids = vec![x];
        let mut cur = x;
        for i in 0..4 {
            let op = if i % 2 == 0 {
                g.add_transpose(cur, None, [1, 0]).unwrap()
            } else {
                g.add_binary(BinaryOp::Add, cur, x, None).unwrap()
            };
            cur = g.output(op, 0).unwrap();
            fuids.push(cur);
        }
        (g, fuids)
    }

    fn ranges(g: &Graph, fuids: &[Fuid]) -> Vec<(usize, usize)> {
        fuids
            .iter()
            .map(|&f| {
                let blob = g.get_tensor(f).unwrap().data().unwrap();
                (blob.offset, blob.offset + blob.len)
            })
            .collect()
    }

    #[test]
    fn test_static_binds_disjoint_ranges() {
        let runtime = Arc::new(CountingRuntime::default());
        let (mut g, fuids) = chain(PlanStrategy::Static, runtime.clone());
        g.data_malloc().unwrap();

        let ranges = ranges(&g, &fuids);
        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                assert!(a.1 <= b.0 || b.1 <= a.0, "{:?} overlaps {:?}", a, b);
            }
        }
        assert_eq!(g.allocator().peak(), 5 * 16 * 16 * 4);
        assert_eq!(*runtime.requests.lock().unwrap(), vec![g.allocator().peak()]);
    }

    #[test]
    fn test_liveness_reuses_dead_intermediates() {
        let fixed = Arc::new(CountingRuntime::default());
        let (mut g_static, _) = chain(PlanStrategy::Static, fixed);
        g_static.data_malloc().unwrap();

        let runtime = Arc::new(CountingRuntime::default());
        let (mut g, fuids) = chain(PlanStrategy::Liveness, runtime.clone());
        g.data_malloc().unwrap();

        assert!(g.allocator().peak() < g_static.allocator().peak());
        assert_eq!(*runtime.requests.lock().unwrap(), vec![g.allocator().peak()]);

        // tensors alive at the same step never overlap
        let r = ranges(&g, &fuids);
        let live_pairs = [(0, 1), (0, 2), (1, 2), (0, 3), (2, 3), (0, 4), (3, 4)];
        for (i, j) in live_pairs {
            let (a, b) = (r[i], r[j]);
            assert!(a.1 <= b.0 || b.1 <= a.0, "{} and {} overlap", i, j);
        }
    }

    #[test]
    fn test_data_access() {
        let (mut g, fuids) = chain(PlanStrategy::Static, Arc::new(CountingRuntime::default()));
        assert!(g.tensor_data(fuids[0]).is_none());
        g.data_malloc().unwrap();

        let x = fuids[0];
        let bytes = g.tensor_data_mut(x).unwrap();
        assert_eq!(bytes.len(), 16 * 16 * 4);
        bytes[0] = 7;
        assert_eq!(g.tensor_data(x).unwrap()[0], 7);

        let base = g.allocator().buffer().unwrap().as_ptr();
        let offset = g.get_tensor(fuids[2]).unwrap().data().unwrap().offset;
        assert_eq!(g.tensor_ptr(fuids[2]), Some(base.wrapping_add(offset)));
    }

    #[test]
    fn test_plan_twice_fails() {
        let (mut g, fuids) = chain(PlanStrategy::Static, Arc::new(CountingRuntime::default()));
        g.data_malloc().unwrap();
        assert_eq!(g.data_malloc(), Err(PlanError::AlreadyBound(fuids[0])));
    }

    #[test]
    fn test_oversized_tensor_is_not_planned() {
        let runtime = Arc::new(CountingRuntime::default());
        let mut g = Graph::new(runtime.clone());
        let x = g.add_tensor(&[2], DataType::Float32);
        let huge = g.add_tensor(&[usize::MAX / 2, 4], DataType::Float32);
        g.add_binary(BinaryOp::Add, x, x, None).unwrap();

        match g.data_malloc() {
            Err(PlanError::SizeOverflow(msg)) => assert!(msg.contains(&huge.to_string())),
            other => panic!("expected size overflow, got {:?}", other),
        }
        assert!(runtime.requests.lock().unwrap().is_empty());
        assert!(!g.get_tensor(x).unwrap().is_bound());
    }

    #[test]
    fn test_unsortable_graph_is_not_planned() {
        let runtime = Arc::new(CountingRuntime::default());
        let mut g = Graph::new(runtime.clone());
        let x = g.add_tensor(&[2], DataType::Float32);
        let a = g.add_binary(BinaryOp::Add, x, x, None).unwrap();
        let ya = g.output(a, 0).unwrap();
        let b = g.add_binary(BinaryOp::Add, ya, ya, None).unwrap();
        let yb = g.output(b, 0).unwrap();
        g.replace_input(a, 0, yb).unwrap();

        assert!(matches!(g.data_malloc(), Err(PlanError::Unsortable { .. })));
        assert!(runtime.requests.lock().unwrap().is_empty());
    }
}
