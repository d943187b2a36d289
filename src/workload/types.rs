use serde::{Deserialize, Serialize};

/// The shared target state for simulated load, in MiB.
///
/// Only the coordinator mutates it; workers keep a cached copy that they
/// overwrite on every poll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadSpec {
    #[serde(rename = "workloadSize")]
    pub total_size: u64,
    #[serde(rename = "chunkSize")]
    pub chunk_size: u64,
}

impl WorkloadSpec {
    /// A spec with no members yet: the whole total is the first chunk.
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            chunk_size: total_size,
        }
    }
}

impl Default for WorkloadSpec {
    fn default() -> Self {
        Self::new(100)
    }
}
