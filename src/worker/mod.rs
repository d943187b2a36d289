//! Worker Module
//!
//! The client side of the fleet protocol, run by every instance (the
//! coordinator included, against its own state).
//!
//! ## Submodules
//! - **`node`**: The poll loop, the worker/coordinator role and the promotion transition.
//! - **`failover`**: Candidate selection when the coordinator disappears.
//! - **`client`**: Outbound HTTP calls to the coordinator, with timeouts.
//! - **`handlers`**: The worker-port API (registration and total proxies, metrics).
//! - **`metrics`**: The plaintext metrics report.

pub mod client;
pub mod failover;
pub mod handlers;
pub mod metrics;
pub mod node;

#[cfg(test)]
mod tests;
