use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Id carried by whichever instance currently holds the coordinator role.
pub const COORDINATOR_ID: &str = "coordinator";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn coordinator() -> Self {
        Self(COORDINATOR_ID.to_string())
    }

    pub fn is_coordinator(&self) -> bool {
        self.0 == COORDINATOR_ID
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single member of the fleet.
///
/// `address` is where this instance serves (or would serve, once promoted)
/// the coordinator endpoints. `last_seen` is local bookkeeping of the
/// coordinator and never leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: InstanceId,
    pub address: String,

    #[serde(skip)]
    pub last_seen: Option<Instant>,
}

impl InstanceRecord {
    pub fn new(id: InstanceId, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            last_seen: Some(Instant::now()),
        }
    }

    /// True when the record has been silent for longer than `expiry` at `now`.
    /// Records that were never seen (deserialized from a peer) count as fresh.
    pub fn is_expired(&self, now: Instant, expiry: std::time::Duration) -> bool {
        match self.last_seen {
            Some(seen) => now.saturating_duration_since(seen) > expiry,
            None => false,
        }
    }
}

impl PartialEq for InstanceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.address == other.address
    }
}

impl Eq for InstanceRecord {}
