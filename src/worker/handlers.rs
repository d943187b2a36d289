//! Worker API
//!
//! Endpoints served on the worker port of every instance, so external callers
//! only need to know one local address. Registration and total updates are
//! relayed to whoever currently holds the coordinator id in the local view.

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{ConnectInfo, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::client::CoordinatorClient;
use super::metrics::report_metrics;
use super::node::SharedView;
use crate::coordinator::handlers::CoordinatorPort;
use crate::coordinator::protocol::{
    ENDPOINT_METRICS, ENDPOINT_REGISTER, ENDPOINT_SET_TOTAL, RegisterRequest, SetTotalQuery,
};
use crate::coordinator::server::{bind, serve};
use crate::error::{FleetError, Result};

pub fn router(view: SharedView, client: CoordinatorClient, coordinator_port: u16) -> Router {
    Router::new()
        .route(ENDPOINT_REGISTER, post(handle_proxy_register))
        .route(ENDPOINT_SET_TOTAL, post(handle_proxy_set_total))
        .route(ENDPOINT_METRICS, get(handle_metrics))
        .layer(Extension(view))
        .layer(Extension(Arc::new(client)))
        .layer(Extension(CoordinatorPort(coordinator_port)))
}

/// Binds the worker port and serves the worker API in the background.
pub async fn start_worker_api(
    bind_addr: &str,
    view: SharedView,
    client: CoordinatorClient,
    coordinator_port: u16,
) -> Result<JoinHandle<()>> {
    let listener = bind(bind_addr).await?;
    tracing::info!("Worker API listening on {}", bind_addr);
    Ok(serve(
        listener,
        router(view, client, coordinator_port),
        "Worker",
    ))
}

async fn current_coordinator(view: &SharedView) -> Result<String> {
    view.read()
        .await
        .coordinator_address()
        .map(str::to_string)
        .ok_or(FleetError::NoCoordinator)
}

fn relay(status: StatusCode, body: Bytes) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

pub async fn handle_proxy_register(
    Extension(view): Extension<SharedView>,
    Extension(client): Extension<Arc<CoordinatorClient>>,
    Extension(CoordinatorPort(port)): Extension<CoordinatorPort>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(mut req): Json<RegisterRequest>,
) -> Result<Response> {
    // The coordinator would otherwise see this proxy as the peer.
    if req.address.is_none()
        && let Some(ConnectInfo(peer)) = peer
    {
        req.address = Some(format!("{}:{}", peer.ip(), port));
    }

    let coordinator = current_coordinator(&view).await?;
    let (status, body) = client
        .forward_register(&coordinator, &req)
        .await
        .inspect_err(|e| tracing::error!("Error forwarding request to register: {}", e))?;

    Ok(relay(status, body))
}

pub async fn handle_proxy_set_total(
    Extension(view): Extension<SharedView>,
    Extension(client): Extension<Arc<CoordinatorClient>>,
    Query(query): Query<SetTotalQuery>,
) -> Result<Response> {
    let coordinator = current_coordinator(&view).await?;
    let (status, body) = client
        .forward_set_total(&coordinator, &query.mem)
        .await
        .inspect_err(|e| tracing::error!("Error forwarding request to set: {}", e))?;

    Ok(relay(status, body))
}

pub async fn handle_metrics(Extension(view): Extension<SharedView>) -> String {
    report_metrics(&*view.read().await)
}
