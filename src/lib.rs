//! Simulated Memory Load Fleet
//!
//! A fleet of identical processes that together hold a configured amount of
//! memory, split evenly across whoever is alive. One process coordinates;
//! all of them work.
//!
//! ## Architecture Modules
//! - **`membership`**: The ordered registry of instances and their liveness bookkeeping.
//! - **`workload`**: The shared target, the equal-split rule, and the local load buffer.
//! - **`coordinator`**: The leader's HTTP API, cluster state and liveness monitor.
//! - **`worker`**: The poll loop, the worker-port API and the failover procedure.
//! - **`config`**, **`error`**, **`net`**: Environment settings, the error taxonomy,
//!   and own-address discovery.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod membership;
pub mod net;
pub mod worker;
pub mod workload;

pub use config::Config;
pub use error::FleetError;
