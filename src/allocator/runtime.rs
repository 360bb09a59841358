//! Backend runtime that owns real memory
//!
//! The allocator plans offsets only; the single real buffer comes from a
//! [`Runtime`] once the arena's peak size is known.

use std::fmt;

use crate::error::{PlanError, PlanResult};

/// Opaque handle to backend memory
#[derive(Debug)]
pub struct RawBuffer {
    data: Box<[u8]>,
}

impl RawBuffer {
    /// Wrap host memory
    pub fn from_boxed(data: Box<[u8]>) -> Self {
        Self { data }
    }

    /// Size of the buffer in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Base address of the buffer
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Whole buffer as bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Whole buffer as mutable bytes
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Backend memory service
///
/// `alloc` and `dealloc` are each invoked at most once per allocator.
pub trait Runtime: Send + Sync + fmt::Debug {
    /// Allocate `bytes` of backend memory
    fn alloc(&self, bytes: usize) -> PlanResult<RawBuffer>;

    /// Return memory obtained from `alloc`
    fn dealloc(&self, _buffer: RawBuffer) {}

    /// Runtime name for diagnostics
    fn name(&self) -> &str;
}

/// Host runtime backed by zeroed system memory
#[derive(Debug, Clone, Default)]
pub struct CpuRuntime;

impl Runtime for CpuRuntime {
    fn alloc(&self, bytes: usize) -> PlanResult<RawBuffer> {
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|e| PlanError::RuntimeAlloc(format!("{} bytes on {}: {}", bytes, self.name(), e)))?;
        data.resize(bytes, 0u8);
        Ok(RawBuffer::from_boxed(data.into_boxed_slice()))
    }

    fn name(&self) -> &str {
        "CPU"
    }
}
