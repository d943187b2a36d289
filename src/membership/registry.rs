//! Ordered membership registry
//!
//! A plain, lock-free container. Callers that share it across tasks wrap it
//! together with the workload spec behind a single lock (see
//! `coordinator::state::ClusterState`), so that every mutation and the
//! chunk recompute that follows it happen in one critical section.

use std::time::{Duration, Instant};

use super::types::{InstanceId, InstanceRecord};

#[derive(Debug, Clone, Default)]
pub struct MembershipRegistry {
    members: Vec<InstanceRecord>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a registry from a peer snapshot, e.g. when this process is
    /// promoted and inherits the membership it last fetched. Every record is
    /// treated as seen just now so nobody is expired before they can poll.
    pub fn from_snapshot(snapshot: Vec<InstanceRecord>) -> Self {
        let now = Instant::now();
        let members = snapshot
            .into_iter()
            .map(|mut record| {
                record.last_seen = Some(now);
                record
            })
            .collect();
        Self { members }
    }

    /// Allocates a fresh id for `address` and appends the record.
    pub fn register(&mut self, address: impl Into<String>) -> InstanceRecord {
        let mut id = InstanceId::new();
        while self.find(&id).is_some() || id.is_coordinator() {
            id = InstanceId::new();
        }

        let record = InstanceRecord::new(id, address);
        self.members.push(record.clone());

        tracing::info!(
            "Registered instance {} at {} (fleet size {})",
            record.id,
            record.address,
            self.members.len()
        );

        record
    }

    /// Inserts the coordinator's own record at the front. Any previous
    /// coordinator record is dropped first so at most one exists.
    pub fn register_coordinator(&mut self, address: impl Into<String>) -> InstanceRecord {
        self.members.retain(|member| !member.id.is_coordinator());

        let record = InstanceRecord::new(InstanceId::coordinator(), address);
        self.members.insert(0, record.clone());
        record
    }

    /// Refreshes `last_seen`. Returns false when no record matches.
    pub fn touch(&mut self, id: &InstanceId) -> bool {
        self.touch_at(id, Instant::now())
    }

    pub fn touch_at(&mut self, id: &InstanceId, now: Instant) -> bool {
        match self.members.iter_mut().find(|member| &member.id == id) {
            Some(member) => {
                member.last_seen = Some(now);
                true
            }
            None => false,
        }
    }

    /// Removes the record at `index`, keeping the relative order of the rest.
    pub fn remove_at(&mut self, index: usize) -> Option<InstanceRecord> {
        if index < self.members.len() {
            Some(self.members.remove(index))
        } else {
            None
        }
    }

    pub fn remove_by_id(&mut self, id: &InstanceId) -> Option<InstanceRecord> {
        let index = self.position(id)?;
        self.remove_at(index)
    }

    /// Removes every non-coordinator record silent for longer than `expiry`.
    ///
    /// Expired ids are collected before anything is removed, so removals
    /// never shift the positions of records still to be examined.
    pub fn expire_stale(&mut self, now: Instant, expiry: Duration) -> Vec<InstanceRecord> {
        let expired: Vec<InstanceId> = self
            .members
            .iter()
            .filter(|member| !member.id.is_coordinator() && member.is_expired(now, expiry))
            .map(|member| member.id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| self.remove_by_id(id))
            .collect()
    }

    pub fn find(&self, id: &InstanceId) -> Option<&InstanceRecord> {
        self.members.iter().find(|member| &member.id == id)
    }

    pub fn position(&self, id: &InstanceId) -> Option<usize> {
        self.members.iter().position(|member| &member.id == id)
    }

    pub fn coordinator(&self) -> Option<&InstanceRecord> {
        self.members.iter().find(|member| member.id.is_coordinator())
    }

    pub fn snapshot(&self) -> Vec<InstanceRecord> {
        self.members.clone()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
