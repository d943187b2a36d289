//! Liveness Monitor
//!
//! Background task owned by the coordinator. Every period it ages out
//! workers that stopped polling for their chunk.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::state::ClusterState;

pub struct LivenessMonitor {
    state: Arc<ClusterState>,
    period: Duration,
    expiry: Duration,
}

impl LivenessMonitor {
    pub fn new(state: Arc<ClusterState>, period: Duration, expiry: Duration) -> Self {
        Self {
            state,
            period,
            expiry,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        tracing::info!(
            "Liveness monitor started (period {:?}, expiry {:?})",
            self.period,
            self.expiry
        );

        let mut interval = tokio::time::interval(self.period);
        // The first tick fires immediately; nobody can be stale yet.
        interval.tick().await;

        loop {
            interval.tick().await;
            self.sweep_once().await;
        }
    }

    /// A single pass. Never fails: there is nothing to propagate to.
    pub async fn sweep_once(&self) -> usize {
        let expired = self.state.sweep_expired(Instant::now(), self.expiry).await;

        for record in &expired {
            tracing::warn!(
                "Instance {} at {} expired (no heartbeat for over {:?})",
                record.id,
                record.address,
                self.expiry
            );
        }

        let members = self.state.membership().await;
        let listing: Vec<String> = members
            .iter()
            .map(|member| format!("{}@{}", member.id, member.address))
            .collect();
        tracing::info!("{} instances: {:?}", members.len(), listing);

        expired.len()
    }
}
