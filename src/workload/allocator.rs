//! Simulated Load
//!
//! Turns a chunk size into resident memory: a byte buffer of the requested
//! size filled with random data so the pages are actually touched.

use rand::Rng;

use crate::error::{FleetError, Result};

const MIB: usize = 1024 * 1024;

/// Bytes needed to hold `size_mib` MiB, or `None` when no buffer on this
/// platform can be that large.
pub fn byte_size(size_mib: u64) -> Option<usize> {
    usize::try_from(size_mib)
        .ok()?
        .checked_mul(MIB)
        .filter(|&bytes| bytes <= isize::MAX as usize)
}

#[derive(Debug, Default)]
pub struct SimulatedLoad {
    buffer: Vec<u8>,
}

impl SimulatedLoad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn size_mib(&self) -> u64 {
        (self.buffer.len() / MIB) as u64
    }

    pub fn matches(&self, size_mib: u64) -> bool {
        byte_size(size_mib) == Some(self.buffer.len())
    }

    /// Reallocates the buffer to `size_mib` MiB and returns the bytes now held.
    /// A buffer that already has the requested size is left untouched, and a
    /// failed allocation leaves the previous buffer in place.
    pub fn resize(&mut self, size_mib: u64) -> Result<usize> {
        if self.matches(size_mib) {
            return Ok(self.buffer.len());
        }

        let bytes = byte_size(size_mib).ok_or_else(|| {
            FleetError::Allocation(format!("{} Mi exceeds the addressable size", size_mib))
        })?;

        tracing::info!("Allocating {} Mi", size_mib);

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(bytes)
            .map_err(|e| FleetError::Allocation(format!("{} Mi: {}", size_mib, e)))?;

        // Reserved pages stay untouched until the old buffer is gone.
        self.buffer = Vec::new();
        buffer.resize(bytes, 0);
        rand::thread_rng().fill(&mut buffer[..]);
        self.buffer = buffer;

        Ok(self.buffer.len())
    }
}
