//! Worker Node
//!
//! Drives one fleet member. The node is either a plain worker, polling a
//! remote coordinator, or the coordinator itself, polling its own state in
//! process. The only transition is worker -> coordinator, taken during
//! failover when this node is the chosen candidate.
//!
//! ## Poll cycle
//! 1. Workers refresh their membership cache from the coordinator.
//! 2. Every node fetches its chunk (the heartbeat).
//! 3. Workers adopt the coordinator's spec.
//! 4. The local buffer is resized if the chunk changed.
//!
//! Any failure to reach the coordinator in steps 1-2 starts a failover. A
//! resize that fails in step 4 keeps the old buffer and is retried next cycle.

use std::sync::Arc;
use tokio::sync::RwLock;

use super::client::CoordinatorClient;
use super::failover::{FailoverDecision, plan_failover};
use crate::config::Config;
use crate::coordinator::server::{CoordinatorHandle, start_coordinator};
use crate::coordinator::state::ClusterState;
use crate::error::{FleetError, Result};
use crate::membership::types::{InstanceId, InstanceRecord};
use crate::workload::allocator::SimulatedLoad;
use crate::workload::types::WorkloadSpec;

/// What this process currently believes about the fleet.
#[derive(Debug, Clone)]
pub struct LocalView {
    pub self_id: InstanceId,
    pub members: Vec<InstanceRecord>,
    pub workload: WorkloadSpec,
}

impl LocalView {
    pub fn coordinator_address(&self) -> Option<&str> {
        self.members
            .iter()
            .find(|member| member.id.is_coordinator())
            .map(|member| member.address.as_str())
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.members.iter().any(|member| &member.id == id)
    }
}

/// Shared with the worker API handlers (proxies, metrics).
pub type SharedView = Arc<RwLock<LocalView>>;

pub enum Role {
    Worker,
    Coordinator(CoordinatorHandle),
}

pub struct WorkerNode {
    config: Config,
    self_address: String,
    view: SharedView,
    role: Role,
    client: CoordinatorClient,
    load: SimulatedLoad,
}

impl WorkerNode {
    pub fn new(
        config: Config,
        self_address: String,
        view: LocalView,
        role: Role,
        client: CoordinatorClient,
    ) -> Self {
        Self {
            config,
            self_address,
            view: Arc::new(RwLock::new(view)),
            role,
            client,
            load: SimulatedLoad::new(),
        }
    }

    /// Joins the fleet through the bootstrap address, or founds a new fleet
    /// with this process as coordinator when nobody answers there.
    pub async fn join(config: Config, self_address: String) -> Result<Self> {
        let client = CoordinatorClient::new(config.request_timeout(), config.connect_timeout())?;

        match client
            .register(&config.bootstrap_address, Some(self_address.clone()))
            .await
        {
            Ok(response) => {
                tracing::info!(
                    "Joined fleet via {} as {} ({} members)",
                    config.bootstrap_address,
                    response.assigned.id,
                    response.members.len()
                );

                let view = LocalView {
                    self_id: response.assigned.id,
                    members: response.members,
                    workload: WorkloadSpec::new(config.initial_total_mib),
                };
                Ok(Self::new(config, self_address, view, Role::Worker, client))
            }
            Err(e) => {
                tracing::warn!(
                    "Can't connect to coordinator at {} ({}), assuming there is none and acting as coordinator",
                    config.bootstrap_address,
                    e
                );

                let state = ClusterState::bootstrap(self_address.clone(), config.initial_total_mib);
                let handle = Self::start_coordinator_role(&config, state.clone()).await?;

                let view = LocalView {
                    self_id: InstanceId::coordinator(),
                    members: state.membership().await,
                    workload: state.workload().await,
                };
                Ok(Self::new(
                    config,
                    self_address,
                    view,
                    Role::Coordinator(handle),
                    client,
                ))
            }
        }
    }

    async fn start_coordinator_role(
        config: &Config,
        state: Arc<ClusterState>,
    ) -> Result<CoordinatorHandle> {
        start_coordinator(
            state,
            &config.coordinator_bind(),
            config.coordinator_port,
            config.monitor_interval(),
            config.expiry(),
        )
        .await
    }

    pub fn view(&self) -> SharedView {
        self.view.clone()
    }

    pub fn client(&self) -> CoordinatorClient {
        self.client.clone()
    }

    pub fn is_coordinator(&self) -> bool {
        matches!(self.role, Role::Coordinator(_))
    }

    pub fn coordinator_handle(&self) -> Option<&CoordinatorHandle> {
        match &self.role {
            Role::Coordinator(handle) => Some(handle),
            Role::Worker => None,
        }
    }

    pub fn load_bytes(&self) -> usize {
        self.load.size_bytes()
    }

    /// Polls forever. Returns only on a fatal error.
    pub async fn run(mut self) -> Result<()> {
        {
            let view = self.view.read().await;
            tracing::info!("Instance ID: {}", view.self_id);
        }

        loop {
            self.poll_once().await?;
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// One poll cycle. Coordinator loss is handled here through failover;
    /// the error cases left over are fatal.
    pub async fn poll_once(&mut self) -> Result<()> {
        let spec = match self.refresh().await {
            Ok(spec) => spec,
            Err(e) if e.is_coordinator_unreachable() => {
                tracing::warn!("Coordinator unreachable: {}", e);
                return self.failover().await;
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.materialize(spec.chunk_size).await {
            tracing::warn!(
                "Keeping {} Mi held, could not allocate {} Mi: {}",
                self.load.size_mib(),
                spec.chunk_size,
                e
            );
        }

        let view = self.view.read().await;
        tracing::info!(
            "Instance ID: {} Chunk: {} Mi Held: {} Mi",
            view.self_id,
            spec.chunk_size,
            self.load.size_mib()
        );

        Ok(())
    }

    async fn refresh(&self) -> Result<WorkloadSpec> {
        match &self.role {
            Role::Coordinator(handle) => {
                let state = handle.state.clone();
                let spec = state.get_chunk(&InstanceId::coordinator()).await;
                let members = state.membership().await;

                let mut view = self.view.write().await;
                view.members = members;
                view.workload = spec;
                Ok(spec)
            }
            Role::Worker => {
                let coordinator = self.coordinator_address().await?;
                let members = self.client.get_membership(&coordinator).await?;

                let (self_id, known) = {
                    let mut view = self.view.write().await;
                    view.members = members;
                    (view.self_id.clone(), view.contains(&view.self_id))
                };

                let self_id = if known {
                    self_id
                } else {
                    self.rejoin(&coordinator).await?
                };

                let spec = self.client.get_chunk(&coordinator, &self_id).await?;
                self.view.write().await.workload = spec;
                Ok(spec)
            }
        }
    }

    /// Registers again after the coordinator aged this instance out.
    async fn rejoin(&self, coordinator: &str) -> Result<InstanceId> {
        let old_id = self.view.read().await.self_id.clone();
        let response = self
            .client
            .register(coordinator, Some(self.self_address.clone()))
            .await?;

        tracing::warn!(
            "Instance {} was dropped from the fleet, rejoined as {}",
            old_id,
            response.assigned.id
        );

        let mut view = self.view.write().await;
        view.self_id = response.assigned.id.clone();
        view.members = response.members;
        Ok(response.assigned.id)
    }

    async fn coordinator_address(&self) -> Result<String> {
        self.view
            .read()
            .await
            .coordinator_address()
            .map(str::to_string)
            .ok_or(FleetError::NoCoordinator)
    }

    async fn materialize(&mut self, chunk_size: u64) -> Result<()> {
        if self.load.matches(chunk_size) {
            return Ok(());
        }

        let mut load = std::mem::take(&mut self.load);
        let (load, resized) = tokio::task::spawn_blocking(move || {
            let resized = load.resize(chunk_size);
            (load, resized)
        })
        .await
        .map_err(|e| FleetError::Allocation(e.to_string()))?;
        self.load = load;

        resized.map(|_| ())
    }

    async fn failover(&mut self) -> Result<()> {
        tracing::info!("Assuming coordinator is not responding anymore. Checking who can take over.");

        let (self_id, members, total_size) = {
            let view = self.view.read().await;
            (
                view.self_id.clone(),
                view.members.clone(),
                view.workload.total_size,
            )
        };

        match plan_failover(&members, &self_id)? {
            FailoverDecision::Promote { members } => {
                tracing::info!("Instance {} taking over as coordinator", self_id);

                let state = ClusterState::from_snapshot(members, total_size);
                let handle = Self::start_coordinator_role(&self.config, state.clone()).await?;

                {
                    let mut view = self.view.write().await;
                    view.self_id = InstanceId::coordinator();
                    view.members = state.membership().await;
                    view.workload = state.workload().await;
                }
                self.role = Role::Coordinator(handle);
            }
            FailoverDecision::Defer { candidate, members } => {
                tracing::info!(
                    "New coordinator: {} My ID: {}. Giving it {:?} to settle",
                    candidate,
                    self_id,
                    self.config.settle_interval()
                );

                self.view.write().await.members = members;
                tokio::time::sleep(self.config.settle_interval()).await;
            }
        }

        Ok(())
    }
}
