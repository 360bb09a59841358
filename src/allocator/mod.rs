//! Arena allocator for static memory planning
//!
//! The allocator runs in two phases:
//!
//! 1. **Planning** - [`Allocator::alloc`] and [`Allocator::free`] hand out and
//!    return byte offsets inside a virtual arena whose final size is unknown.
//!    Requests are served first-fit from the free-block map; a request that
//!    fits nowhere is carved from the arena end, raising the peak.
//! 2. **Bound** - the first [`Allocator::materialize`] asks the [`Runtime`]
//!    for exactly `peak` bytes. Every offset handed out during planning is a
//!    byte offset into that buffer. No further planning is allowed.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tensor_planner::allocator::{Allocator, CpuRuntime};
//!
//! let mut allocator = Allocator::new(Arc::new(CpuRuntime));
//! let a = allocator.alloc(10)?;
//! let b = allocator.alloc(20)?;
//! allocator.free(a, 10)?;
//! assert_eq!(allocator.alloc(10)?, a);
//! let buffer = allocator.materialize()?;
//! assert_eq!(buffer.size(), allocator.peak());
//! ```

pub mod runtime;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, trace};

pub use runtime::{CpuRuntime, RawBuffer, Runtime};

use crate::error::{PlanError, PlanResult};
use crate::tensor::MAX_DTYPE_SIZE;

/// Allocator lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Offsets are still being planned
    Planning,
    /// The backing buffer exists; planning is closed
    Bound,
}

/// Offset allocator with block splitting and coalescing
///
/// Invariants kept after every operation:
/// - free blocks never overlap and never touch each other
/// - every offset and length is a multiple of the alignment
/// - `end` only grows, so `peak == end`
#[derive(Debug)]
pub struct Allocator {
    runtime: Arc<dyn Runtime>,
    alignment: usize,
    /// Bytes currently handed out
    used: usize,
    /// Carve pointer: one past the highest byte ever handed out
    end: usize,
    /// Arena size needed to hold every planned range
    peak: usize,
    /// start offset → length
    free_blocks: BTreeMap<usize, usize>,
    buffer: Option<RawBuffer>,
}

impl Allocator {
    /// Create an allocator aligned to the widest supported element type
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self::with_alignment(runtime, MAX_DTYPE_SIZE)
    }

    /// Create an allocator with a custom alignment (clamped to at least 1)
    pub fn with_alignment(runtime: Arc<dyn Runtime>, alignment: usize) -> Self {
        Self {
            runtime,
            alignment: alignment.max(1),
            used: 0,
            end: 0,
            peak: 0,
            free_blocks: BTreeMap::new(),
            buffer: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        if self.buffer.is_some() {
            Phase::Bound
        } else {
            Phase::Planning
        }
    }

    /// Alignment every offset and size is rounded to
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Bytes currently allocated
    pub fn used(&self) -> usize {
        self.used
    }

    /// Size of the buffer the arena needs
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Free blocks as `(offset, length)` in offset order
    pub fn free_blocks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.free_blocks.iter().map(|(&offset, &len)| (offset, len))
    }

    /// Round a request up to the alignment; empty requests take one unit
    pub fn aligned_size(&self, size: usize) -> PlanResult<usize> {
        size.max(1)
            .div_ceil(self.alignment)
            .checked_mul(self.alignment)
            .ok_or_else(|| PlanError::SizeOverflow(format!("request of {} bytes", size)))
    }

    fn ensure_planning(&self) -> PlanResult<()> {
        match self.phase() {
            Phase::Planning => Ok(()),
            Phase::Bound => Err(PlanError::AllocatorSealed),
        }
    }

    /// Reserve `size` bytes and return their offset
    pub fn alloc(&mut self, size: usize) -> PlanResult<usize> {
        self.ensure_planning()?;
        let size = self.aligned_size(size)?;

        let first_fit = self
            .free_blocks
            .iter()
            .find(|&(_, &len)| len >= size)
            .map(|(&offset, &len)| (offset, len));

        let offset = match first_fit {
            Some((offset, len)) => {
                self.free_blocks.remove(&offset);
                if len > size {
                    self.free_blocks.insert(offset + size, len - size);
                }
                offset
            }
            None => {
                let offset = self.end;
                self.end = offset.checked_add(size).ok_or_else(|| {
                    PlanError::SizeOverflow(format!(
                        "arena end {} plus {} bytes",
                        offset, size
                    ))
                })?;
                self.peak = self.peak.max(self.end);
                offset
            }
        };

        self.used += size;
        trace!(offset, size, used = self.used, "arena alloc");
        Ok(offset)
    }

    /// Return `size` bytes at `addr` to the arena
    pub fn free(&mut self, addr: usize, size: usize) -> PlanResult<()> {
        self.ensure_planning()?;
        let size = self.aligned_size(size)?;
        let invalid = PlanError::InvalidFree { addr, size };

        let stop = addr.checked_add(size).ok_or_else(|| invalid.clone())?;
        if addr % self.alignment != 0
            || stop > self.end
            || size > self.used
            || self.overlaps_free(addr, stop)
        {
            return Err(invalid);
        }
        self.used -= size;

        let mut start = addr;
        let mut stop = stop;

        if let Some((&prev, &len)) = self.free_blocks.range(..start).next_back() {
            if prev + len == start {
                start = prev;
                self.free_blocks.remove(&prev);
            }
        }
        if let Some(len) = self.free_blocks.remove(&stop) {
            stop += len;
        }
        self.free_blocks.insert(start, stop - start);

        trace!(addr, size, used = self.used, "arena free");
        Ok(())
    }

    fn overlaps_free(&self, start: usize, stop: usize) -> bool {
        // blocks are disjoint, so only the last one starting before `stop` can overlap
        self.free_blocks
            .range(..stop)
            .next_back()
            .is_some_and(|(&offset, &len)| offset + len > start)
    }

    /// Materialize the arena, requesting exactly `peak` bytes on first call
    pub fn materialize(&mut self) -> PlanResult<&RawBuffer> {
        let buffer = match self.buffer.take() {
            Some(buffer) => buffer,
            None => {
                let buffer = self.runtime.alloc(self.peak)?;
                info!(
                    runtime = self.runtime.name(),
                    bytes = self.peak,
                    base = ?buffer.as_ptr(),
                    "arena materialized"
                );
                buffer
            }
        };
        Ok(&*self.buffer.insert(buffer))
    }

    /// Backing buffer, once materialized
    pub fn buffer(&self) -> Option<&RawBuffer> {
        self.buffer.as_ref()
    }

    /// Mutable backing buffer, once materialized
    pub fn buffer_mut(&mut self) -> Option<&mut RawBuffer> {
        self.buffer.as_mut()
    }

    /// Usage line, e.g. `Used memory: 96, peak memory: 128`
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Log current usage
    pub fn info(&self) {
        info!(used = self.used, peak = self.peak, "allocator usage");
    }
}

impl fmt::Display for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Used memory: {}, peak memory: {}", self.used, self.peak)
    }
}

impl Drop for Allocator {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.runtime.dealloc(buffer);
        }
    }
}
