//! Leader election and role assignment for one pursued frequency.
//!
//! The election is a pure function of a candidate snapshot, so every agent
//! holding the same snapshot computes the same leader without a vote round.
//! Concurrent elections triggered by near-simultaneous violation reports
//! reconcile as last-writer-wins per frequency (the protocol is idempotent).

use rfs_core::{DroneId, PURSUIT_ROLES, Role};
use rfs_proto::RoleAssignment;

/// RSSI assumed for an agent with no reading at the pursued frequency, dBm.
pub const NO_SIGNAL_RSSI: f64 = -100.0;

/// One agent's claim in the election.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub drone_id: DroneId,
    /// Latest RSSI at the pursued frequency, dBm.
    pub rssi:     f64,
    /// Battery percentage; breaks RSSI ties.
    pub battery:  f64,
}

/// The result of an election: a leader plus a role for every candidate
/// (the leader's own entry is `Role::Lead`).
#[derive(Clone, Debug, PartialEq)]
pub struct ElectionOutcome {
    pub leader:      DroneId,
    pub assignments: Vec<RoleAssignment>,
}

impl ElectionOutcome {
    /// The role assigned to `drone_id`, if it was a candidate.
    pub fn role_of(&self, drone_id: &DroneId) -> Option<Role> {
        self.assignments
            .iter()
            .find(|a| &a.drone_id == drone_id)
            .map(|a| a.role)
    }
}

/// Rank candidates: strongest signal first, battery breaks RSSI ties, id
/// breaks full ties so the order is deterministic for any input permutation.
pub fn rank(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.rssi
            .total_cmp(&a.rssi)
            .then_with(|| b.battery.total_cmp(&a.battery))
            .then_with(|| a.drone_id.cmp(&b.drone_id))
    });
    candidates
}

/// Elect a leader and assign roles down the ranking.
///
/// Rank 0 is LEAD, then TRIANGULATION, BACKUP, SCOUT; candidates ranked past
/// the sequence are clamped to SCOUT.  A single candidate self-elects.
/// Returns `None` only for an empty candidate set.
pub fn elect(candidates: Vec<Candidate>) -> Option<ElectionOutcome> {
    let ranked = rank(candidates);
    let leader = ranked.first()?.drone_id.clone();

    let assignments = ranked
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| RoleAssignment {
            drone_id: candidate.drone_id,
            role:     PURSUIT_ROLES[i.min(PURSUIT_ROLES.len() - 1)],
        })
        .collect();

    Some(ElectionOutcome { leader, assignments })
}
