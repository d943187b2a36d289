//! Cluster State
//!
//! The coordinator's only shared mutable structure: the membership registry
//! and the workload spec behind one lock. Every compound operation (mutate,
//! then recompute the chunk size) runs inside a single critical section so
//! no reader can observe a chunk size that disagrees with the fleet size.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::protocol::RegisterResponse;
use crate::error::{FleetError, Result};
use crate::membership::registry::MembershipRegistry;
use crate::membership::types::{InstanceId, InstanceRecord};
use crate::workload::allocator::byte_size;
use crate::workload::partitioner::recompute;
use crate::workload::types::WorkloadSpec;

#[derive(Debug)]
struct ClusterInner {
    registry: MembershipRegistry,
    workload: WorkloadSpec,
}

impl ClusterInner {
    fn recompute(&mut self) {
        let count = self.registry.len();
        if recompute(&mut self.workload, count) {
            tracing::info!(
                "Chunk size now {} MiB ({} MiB across {} instances)",
                self.workload.chunk_size,
                self.workload.total_size,
                count
            );
        }
    }
}

#[derive(Debug)]
pub struct ClusterState {
    inner: Mutex<ClusterInner>,
}

impl ClusterState {
    /// State for a brand new fleet: this process is the only member and holds
    /// the coordinator id at `coordinator_address`.
    pub fn bootstrap(coordinator_address: impl Into<String>, total_size: u64) -> Arc<Self> {
        let mut registry = MembershipRegistry::new();
        registry.register_coordinator(coordinator_address);
        Self::with_registry(registry, total_size)
    }

    /// State inherited by a promoted worker. `members` is its last fetched
    /// snapshot, already relabeled so that it holds the coordinator id.
    pub fn from_snapshot(members: Vec<InstanceRecord>, total_size: u64) -> Arc<Self> {
        Self::with_registry(MembershipRegistry::from_snapshot(members), total_size)
    }

    fn with_registry(registry: MembershipRegistry, total_size: u64) -> Arc<Self> {
        let mut inner = ClusterInner {
            registry,
            workload: WorkloadSpec::new(total_size),
        };
        inner.recompute();

        Arc::new(Self {
            inner: Mutex::new(inner),
        })
    }

    pub async fn register(&self, address: impl Into<String>) -> RegisterResponse {
        let mut inner = self.inner.lock().await;
        let assigned = inner.registry.register(address);
        inner.recompute();

        RegisterResponse {
            assigned,
            members: inner.registry.snapshot(),
        }
    }

    /// Heartbeat plus work assignment. Unknown ids still get the spec.
    pub async fn get_chunk(&self, id: &InstanceId) -> WorkloadSpec {
        let mut inner = self.inner.lock().await;
        if !inner.registry.touch(id) {
            tracing::warn!("Chunk request from unknown instance {}", id);
        }
        inner.workload
    }

    pub async fn membership(&self) -> Vec<InstanceRecord> {
        self.inner.lock().await.registry.snapshot()
    }

    pub async fn workload(&self) -> WorkloadSpec {
        self.inner.lock().await.workload
    }

    pub async fn instance_count(&self) -> usize {
        self.inner.lock().await.registry.len()
    }

    /// Parses and applies a new total. Anything that is not a non-negative
    /// integer, or is too large to ever be held in memory, is rejected and
    /// leaves the state untouched.
    pub async fn set_total(&self, raw: &str) -> Result<WorkloadSpec> {
        let total_size: u64 = raw
            .trim()
            .parse()
            .ok()
            .filter(|&total| byte_size(total).is_some())
            .ok_or_else(|| FleetError::InvalidTotal {
                input: raw.to_string(),
            })?;

        let mut inner = self.inner.lock().await;
        inner.workload.total_size = total_size;
        inner.recompute();

        tracing::info!("Total workload set to {} MiB", total_size);
        Ok(inner.workload)
    }

    pub async fn remove_at(&self, index: usize) -> Option<InstanceRecord> {
        let mut inner = self.inner.lock().await;
        let removed = inner.registry.remove_at(index)?;
        inner.recompute();
        Some(removed)
    }

    /// One liveness pass: drops every worker silent for longer than `expiry`
    /// and recomputes the chunk size if anyone left.
    pub async fn sweep_expired(&self, now: Instant, expiry: Duration) -> Vec<InstanceRecord> {
        let mut inner = self.inner.lock().await;
        let expired = inner.registry.expire_stale(now, expiry);
        if !expired.is_empty() {
            inner.recompute();
        }
        expired
    }
}
