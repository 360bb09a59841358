//! Fusion preconditions

use crate::error::PlanResult;
use crate::graph::{Graph, Guid};

/// Check whether `producer` can be folded into `consumer`
///
/// The producer must have exactly one output, read by `consumer` alone and
/// through exactly one input slot. Any other reader would still need the
/// producer's result.
pub fn can_fuse(graph: &Graph, producer: Guid, consumer: Guid) -> PlanResult<bool> {
    let [output] = graph.op(producer)?.outputs() else {
        return Ok(false);
    };
    let targets = graph.get_tensor(*output)?.targets();
    if targets.len() != 1 || !targets.contains(&consumer) {
        return Ok(false);
    }
    let reads = graph
        .op(consumer)?
        .inputs()
        .iter()
        .filter(|&fuid| fuid == output)
        .count();
    Ok(reads == 1)
}

/// Input slot through which `consumer` reads `producer`'s single output
pub fn fused_slot(graph: &Graph, producer: Guid, consumer: Guid) -> PlanResult<Option<usize>> {
    if !can_fuse(graph, producer, consumer)? {
        return Ok(None);
    }
    let output = graph.output(producer, 0)?;
    Ok(graph.op(consumer)?.inputs().iter().position(|&f| f == output))
}
