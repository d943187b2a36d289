//! Error types for the fleet
//!
//! One taxonomy shared by the coordinator handlers, the worker poll loop
//! and the failover procedure. Request handlers turn these into HTTP
//! responses; the poll loop decides between failover and exit based on
//! the variant.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Primary error type for all fleet operations
#[derive(Debug, Error)]
pub enum FleetError {
    /// SetTotal received something that is not a non-negative integer, or a
    /// total no buffer could hold
    #[error("Error parsing memory: {input:?} is not a non-negative integer of addressable size")]
    InvalidTotal { input: String },

    /// Registration carried no address and the peer address is unknown
    #[error("Registration request has no address and the peer address is unknown")]
    MissingAddress,

    /// Outbound call failed to connect, timed out, or returned an unreadable body
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The coordinator answered, but not with a success status
    #[error("Coordinator at {url} answered {status}")]
    CoordinatorStatus { url: String, status: u16 },

    /// Failover found no candidate left to promote
    #[error("No instance left to take over coordination")]
    FleetExhausted,

    /// The local cache has no record marked as coordinator
    #[error("No coordinator known in local membership view")]
    NoCoordinator,

    /// A listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The simulated load could not be resized
    #[error("Simulated load allocation failed: {0}")]
    Allocation(String),
}

impl FleetError {
    /// Errors that mean "the coordinator cannot be reached" and should
    /// start a failover rather than abort the poll loop.
    pub fn is_coordinator_unreachable(&self) -> bool {
        matches!(
            self,
            FleetError::Transport { .. }
                | FleetError::CoordinatorStatus { .. }
                | FleetError::NoCoordinator
        )
    }
}

impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        let status = match &self {
            FleetError::InvalidTotal { .. } | FleetError::MissingAddress => {
                StatusCode::BAD_REQUEST
            }
            FleetError::Transport { .. }
            | FleetError::CoordinatorStatus { .. }
            | FleetError::NoCoordinator => StatusCode::BAD_GATEWAY,
            FleetError::FleetExhausted
            | FleetError::Bind { .. }
            | FleetError::Serialization(_)
            | FleetError::Allocation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!(error = %self, status = %status, "Request error");

        let body = Json(json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
