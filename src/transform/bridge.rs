//! Bridge consumers across a removed operator
//!
//! When an operator is eliminated, the consumers of its output have to read
//! another tensor instead. This module moves them over while keeping every
//! edge of the graph consistent.

use crate::error::PlanResult;
use crate::graph::{Fuid, Graph, Guid};

/// Rewire every consumer of `from` to read `to` instead
///
/// All slots reading `from` are replaced, including repeated ones.
///
/// # Returns
/// * Number of input slots rewired
pub fn bridge_consumers(graph: &mut Graph, from: Fuid, to: Fuid) -> PlanResult<usize> {
    let consumers: Vec<Guid> = graph.get_tensor(from)?.targets().iter().copied().collect();
    let mut bridged = 0;

    for consumer in consumers {
        let slots: Vec<usize> = graph
            .op(consumer)?
            .inputs()
            .iter()
            .enumerate()
            .filter(|&(_, &fuid)| fuid == from)
            .map(|(slot, _)| slot)
            .collect();
        for slot in slots {
            graph.replace_input(consumer, slot, to)?;
            bridged += 1;
        }
    }

    Ok(bridged)
}
