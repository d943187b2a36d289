//! Coordinator Module
//!
//! The server side of the fleet protocol, run by whichever instance currently
//! holds the `"coordinator"` id.
//!
//! ## Responsibilities
//! - **Registration**: Hands out instance ids and returns the ordered membership.
//! - **Heartbeats**: Chunk queries refresh the caller's `last_seen`.
//! - **Partitioning**: Keeps `chunkSize` equal to `totalSize / members` after every change.
//! - **Expiry**: The liveness monitor drops workers that stopped polling.
//!
//! ## Submodules
//! - **`state`**: `ClusterState`, the registry and workload spec behind one lock.
//! - **`handlers`**: Axum handlers for the coordinator endpoints.
//! - **`monitor`**: The periodic liveness sweep.
//! - **`protocol`**: Endpoint paths and DTOs shared with the worker side.
//! - **`server`**: Router assembly, binding and startup.

pub mod handlers;
pub mod monitor;
pub mod protocol;
pub mod server;
pub mod state;
