//! Execution order and shape propagation

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::error::{PlanError, PlanResult};
use crate::tensor::Shape;
use crate::traits::InferShape;

use super::context::Graph;
use super::maps::Guid;

impl Graph {
    /// Reorder operators so every producer precedes its consumers
    ///
    /// Repeatedly scans the unplaced operators in their current order and
    /// places each one whose inputs are all graph inputs or outputs of
    /// already placed operators. Ties keep the previous relative order.
    /// Fails with [`PlanError::Unsortable`] when a scan places nothing;
    /// the previous order is left untouched in that case.
    pub fn topo_sort(&mut self) -> PlanResult<()> {
        if self.sorted {
            return Ok(());
        }
        self.compact();

        let total = self.ops.len();
        let mut order: Vec<Guid> = Vec::with_capacity(total);
        let mut placed: FxHashSet<Guid> = FxHashSet::default();
        let mut rounds = 0usize;

        while order.len() < total {
            let mut progressed = false;
            for (&guid, entry) in &self.ops {
                if placed.contains(&guid) {
                    continue;
                }
                let ready = entry.op.inputs().iter().all(|fuid| match self.tensors.get(fuid) {
                    Some(tensor) => tensor.source().map_or(true, |src| placed.contains(&src)),
                    None => false,
                });
                if ready {
                    placed.insert(guid);
                    order.push(guid);
                    progressed = true;
                }
            }
            rounds += 1;
            if !progressed {
                return Err(PlanError::Unsortable {
                    remaining: total - order.len(),
                });
            }
        }

        let mut ops = std::mem::take(&mut self.ops);
        for guid in order {
            if let Some(entry) = ops.shift_remove(&guid) {
                self.ops.insert(guid, entry);
            }
        }
        self.sorted = true;
        debug!(ops = total, rounds, "graph sorted");
        Ok(())
    }

    /// Recompute every output shape in topological order
    ///
    /// Tensors whose shape changes are updated in place.
    pub fn shape_infer(&mut self) -> PlanResult<()> {
        self.topo_sort()?;

        let order: Vec<Guid> = self.ops.keys().copied().collect();
        for guid in order {
            let (shapes, outputs) = {
                let op = self.op(guid)?;
                let inputs = op
                    .inputs()
                    .iter()
                    .map(|&fuid| self.get_tensor(fuid))
                    .collect::<PlanResult<Vec<_>>>()?;
                let shapes: Vec<Shape> =
                    op.kind().infer_shape(&inputs).ok_or_else(|| {
                        let dims: Vec<Vec<usize>> =
                            inputs.iter().map(|t| t.dims().to_vec()).collect();
                        PlanError::ShapeInference {
                            op: guid,
                            reason: format!("{} rejects input shapes {:?}", op, dims),
                        }
                    })?;
                (shapes, op.outputs().to_vec())
            };

            if shapes.len() != outputs.len() {
                return Err(PlanError::OutputArity {
                    op: guid,
                    expected: outputs.len(),
                    actual: shapes.len(),
                });
            }
            for (fuid, shape) in outputs.into_iter().zip(shapes) {
                let tensor = self.tensor_mut(fuid)?;
                if tensor.dims() != shape.as_slice() {
                    trace!(tensor = %fuid, from = ?tensor.dims(), to = ?shape.as_slice(), "shape updated");
                    tensor.set_shape(shape);
                }
            }
        }
        Ok(())
    }
}
