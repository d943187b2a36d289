//! Failover
//!
//! Decides who replaces an unreachable coordinator. There is no vote: every
//! worker runs the same rule on its cached membership, so workers holding the
//! same ordered snapshot arrive at the same candidate. Workers whose snapshots
//! have diverged can disagree, and more than one of them may promote itself.

use crate::error::{FleetError, Result};
use crate::membership::types::{InstanceId, InstanceRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverDecision {
    /// This worker is the candidate and must start the coordinator role.
    Promote { members: Vec<InstanceRecord> },
    /// Someone else takes over; wait for them to settle.
    Defer {
        candidate: InstanceId,
        members: Vec<InstanceRecord>,
    },
}

impl FailoverDecision {
    /// Membership after the old coordinator is dropped and the candidate
    /// relabeled as coordinator.
    pub fn members(&self) -> &[InstanceRecord] {
        match self {
            FailoverDecision::Promote { members } => members,
            FailoverDecision::Defer { members, .. } => members,
        }
    }
}

/// The id that will take over from the current coordinator.
pub fn select_candidate(members: &[InstanceRecord]) -> Result<InstanceId> {
    let (_, candidate) = drop_coordinator(members)?;
    Ok(candidate)
}

pub fn plan_failover(members: &[InstanceRecord], self_id: &InstanceId) -> Result<FailoverDecision> {
    let (mut remaining, candidate) = drop_coordinator(members)?;
    remaining[0].id = InstanceId::coordinator();

    if &candidate == self_id {
        Ok(FailoverDecision::Promote { members: remaining })
    } else {
        Ok(FailoverDecision::Defer {
            candidate,
            members: remaining,
        })
    }
}

/// Removes the coordinator record (the front one if none is labeled) and
/// returns what is left together with the new front's id.
fn drop_coordinator(members: &[InstanceRecord]) -> Result<(Vec<InstanceRecord>, InstanceId)> {
    if members.len() <= 1 {
        return Err(FleetError::FleetExhausted);
    }

    let mut remaining = members.to_vec();
    let index = remaining
        .iter()
        .position(|member| member.id.is_coordinator())
        .unwrap_or(0);
    remaining.remove(index);

    let candidate = remaining[0].id.clone();
    Ok((remaining, candidate))
}
