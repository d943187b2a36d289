//! Coordination Network Protocol
//!
//! Endpoints and Data Transfer Objects shared by the coordinator server,
//! the worker-side proxies and the outbound client. Everything travels as
//! JSON over HTTP.

use serde::{Deserialize, Serialize};

use crate::membership::types::InstanceRecord;

// --- API Endpoints ---

/// Adds the caller to the fleet. Served on both ports; the worker port proxies.
pub const ENDPOINT_REGISTER: &str = "/register";
/// Returns the current workload spec. Doubles as the liveness heartbeat.
pub const ENDPOINT_CHUNK: &str = "/chunk";
/// Returns the ordered membership snapshot.
pub const ENDPOINT_MEMBERS: &str = "/members";
/// Changes the total workload (`?mem=<MiB>`). Served on both ports.
pub const ENDPOINT_SET_TOTAL: &str = "/set";
/// Plaintext gauges, worker port only.
pub const ENDPOINT_METRICS: &str = "/metrics";

// --- Data Transfer Objects ---

/// Registration request.
///
/// `address` is where the caller will serve coordinator duties if promoted.
/// When absent, the coordinator derives it from the peer IP of the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub address: Option<String>,
}

/// Registration result: the new record plus the full, ordered snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub assigned: InstanceRecord,
    pub members: Vec<InstanceRecord>,
}

/// Query for the chunk (heartbeat) endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkQuery {
    pub id: String,
}

/// Query for the set-total endpoint. Kept as a raw string so malformed
/// integers reach the validation path rather than a generic rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTotalQuery {
    pub mem: String,
}
