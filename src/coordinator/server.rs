//! Coordinator Server
//!
//! Wires the coordinator handlers into a router, binds the well-known
//! coordinator port and starts the liveness monitor next to it.

use axum::{
    Extension, Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::handlers::{
    CoordinatorPort, handle_get_chunk, handle_get_members, handle_register, handle_set_total,
};
use super::monitor::LivenessMonitor;
use super::protocol::{ENDPOINT_CHUNK, ENDPOINT_MEMBERS, ENDPOINT_REGISTER, ENDPOINT_SET_TOTAL};
use super::state::ClusterState;
use crate::error::{FleetError, Result};

pub fn router(state: Arc<ClusterState>, coordinator_port: u16) -> Router {
    Router::new()
        .route(ENDPOINT_REGISTER, post(handle_register))
        .route(ENDPOINT_CHUNK, get(handle_get_chunk))
        .route(ENDPOINT_MEMBERS, get(handle_get_members))
        .route(ENDPOINT_SET_TOTAL, post(handle_set_total))
        .layer(Extension(state))
        .layer(Extension(CoordinatorPort(coordinator_port)))
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| FleetError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Serves `app` on `listener` in the background, exposing peer addresses
/// to the handlers.
pub fn serve(listener: TcpListener, app: Router, role: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        let local = listener.local_addr().ok();
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            tracing::error!("{} server on {:?} stopped: {}", role, local, e);
        }
    })
}

/// A running coordinator: the HTTP server and its liveness monitor.
pub struct CoordinatorHandle {
    pub state: Arc<ClusterState>,
    pub local_addr: SocketAddr,
    server: JoinHandle<()>,
    monitor: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Stops serving. Only used when a process winds down in tests; a live
    /// fleet member never steps down.
    pub fn abort(&self) {
        self.server.abort();
        self.monitor.abort();
    }
}

/// Binds `bind_addr` and starts the coordinator role for `state`.
///
/// The listener is bound before this returns, so requests issued right
/// afterwards (including this process's own worker polls) are accepted.
pub async fn start_coordinator(
    state: Arc<ClusterState>,
    bind_addr: &str,
    coordinator_port: u16,
    monitor_period: Duration,
    expiry: Duration,
) -> Result<CoordinatorHandle> {
    let listener = bind(bind_addr).await?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| FleetError::Bind {
            addr: bind_addr.to_string(),
            source,
        })?;

    tracing::info!("Coordinator listening on {}", local_addr);

    let server = serve(
        listener,
        router(state.clone(), coordinator_port),
        "Coordinator",
    );
    let monitor = LivenessMonitor::new(state.clone(), monitor_period, expiry).spawn();

    Ok(CoordinatorHandle {
        state,
        local_addr,
        server,
        monitor,
    })
}
