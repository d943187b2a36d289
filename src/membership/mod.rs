//! Membership Module
//!
//! Keeps track of which instances make up the fleet.
//!
//! ## Core Concepts
//! - **Ordering**: Records keep insertion order. The record at index 0 after the
//!   coordinator is the next failover candidate, so every instance must see the
//!   same order to agree on who takes over.
//! - **Identity**: Ids are random UUIDs assigned by the coordinator. The reserved
//!   id `"coordinator"` marks the current leader.
//! - **Liveness**: `last_seen` is only meaningful inside the coordinator process and
//!   is refreshed by chunk polls.

pub mod registry;
pub mod types;
