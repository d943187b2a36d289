use axum::{
    Extension, Json,
    extract::{ConnectInfo, Query},
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::protocol::{ChunkQuery, RegisterRequest, RegisterResponse, SetTotalQuery};
use super::state::ClusterState;
use crate::error::FleetError;
use crate::membership::types::{InstanceId, InstanceRecord};
use crate::workload::types::WorkloadSpec;

/// Port every instance uses for coordinator duties. Registrations without an
/// explicit address get the peer IP combined with this port.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorPort(pub u16);

pub async fn handle_register(
    Extension(state): Extension<Arc<ClusterState>>,
    Extension(CoordinatorPort(port)): Extension<CoordinatorPort>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, FleetError> {
    let address = match (req.address, peer) {
        (Some(address), _) => address,
        (None, Some(ConnectInfo(peer))) => format!("{}:{}", peer.ip(), port),
        (None, None) => return Err(FleetError::MissingAddress),
    };

    let response = state.register(address).await;
    tracing::debug!(
        "Registration of {} answered with {} members",
        response.assigned.id,
        response.members.len()
    );

    Ok(Json(response))
}

pub async fn handle_get_chunk(
    Extension(state): Extension<Arc<ClusterState>>,
    Query(query): Query<ChunkQuery>,
) -> Json<WorkloadSpec> {
    Json(state.get_chunk(&InstanceId(query.id)).await)
}

pub async fn handle_get_members(
    Extension(state): Extension<Arc<ClusterState>>,
) -> Json<Vec<InstanceRecord>> {
    Json(state.membership().await)
}

pub async fn handle_set_total(
    Extension(state): Extension<Arc<ClusterState>>,
    Query(query): Query<SetTotalQuery>,
) -> Result<Json<WorkloadSpec>, FleetError> {
    state.set_total(&query.mem).await.map(Json)
}
