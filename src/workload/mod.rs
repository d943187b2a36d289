//! Workload Module
//!
//! The shared target (`WorkloadSpec`), the rule that splits it into equal
//! per-instance chunks, and the local buffer that materializes a chunk.

pub mod allocator;
pub mod partitioner;
pub mod types;
