//! Pairwise collision detection and evasive maneuver planning.
//!
//! Runs every behavior cycle against the fresh-peer snapshot.  The yielding
//! rule is priority-based: the agent with lower or *equal* role priority
//! yields, so two same-role agents both plan an evasive move and separation
//! is restored by whichever command lands first.

use tracing::warn;

use rfs_core::{DroneId, GeoPoint, Role, Timestamp};

use crate::config::{MAX_ALTITUDE_M, MIN_ALTITUDE_M, SAFE_ALTITUDE_STEP_M, SwarmParams};
use crate::state::SwarmState;

/// A detected separation violation with one peer.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionRisk {
    pub peer_id:       DroneId,
    pub peer_role:     Role,
    pub peer_location: GeoPoint,
    /// Horizontal separation, metres.
    pub horizontal_m:  f64,
    /// Absolute altitude difference, metres.
    pub vertical_m:    f64,
}

/// The evasive move the planner chose.
#[derive(Clone, Debug, PartialEq)]
pub enum AvoidanceManeuver {
    /// Fly to this point (lateral displacement away from the peer).
    Lateral(GeoPoint),
    /// Change to this absolute altitude, metres.
    Altitude(f64),
}

/// Scan fresh peers for separation violations against `self_location`.
///
/// A pair is at risk when horizontal separation is under `min_separation_m`
/// *and* vertical separation is under `min_vertical_separation_m` — drones
/// stacked with enough altitude margin are safe.
pub fn detect_risks(
    state: &SwarmState,
    self_location: GeoPoint,
    params: &SwarmParams,
    now: Timestamp,
) -> Vec<CollisionRisk> {
    let mut risks = Vec::new();
    for (id, peer) in state.fresh_peers(now) {
        let Some(peer_location) = peer.location else {
            continue;
        };
        let horizontal = self_location.surface_distance_m(peer_location);
        let vertical = (self_location.alt - peer_location.alt).abs();
        if horizontal < params.min_separation_m && vertical < params.min_vertical_separation_m {
            risks.push(CollisionRisk {
                peer_id: id.clone(),
                peer_role: peer.role,
                peer_location,
                horizontal_m: horizontal,
                vertical_m: vertical,
            });
        }
    }
    risks
}

/// Decide whether we yield to `risk` and, if so, how.
///
/// Yield when our role priority is less than or equal to the peer's.  The
/// maneuver choice depends on the vertical geometry: when the altitude gap is
/// already small, climbing or descending the standard step would converge the
/// pair, so we displace laterally away from the peer instead; otherwise we
/// widen the vertical gap (descend when below the peer, climb when above),
/// clamped to the flight envelope.
pub fn plan_avoidance(
    self_role: Role,
    self_location: GeoPoint,
    risk: &CollisionRisk,
    min_separation_m: f64,
) -> Option<AvoidanceManeuver> {
    if self_role.priority() > risk.peer_role.priority() {
        return None;
    }

    warn!(
        peer = %risk.peer_id,
        horizontal_m = risk.horizontal_m,
        vertical_m = risk.vertical_m,
        "separation violation, yielding"
    );

    if risk.vertical_m < 0.8 * SAFE_ALTITUDE_STEP_M {
        // Too close vertically for an altitude move to help; continue the
        // peer→self bearing outward by the minimum separation.
        let bearing_away = risk.peer_location.bearing_to(self_location);
        let target = self_location.destination(min_separation_m, bearing_away);
        Some(AvoidanceManeuver::Lateral(target))
    } else {
        let step = if self_location.alt <= risk.peer_location.alt {
            -SAFE_ALTITUDE_STEP_M
        } else {
            SAFE_ALTITUDE_STEP_M
        };
        let altitude = (self_location.alt + step).clamp(MIN_ALTITUDE_M, MAX_ALTITUDE_M);
        Some(AvoidanceManeuver::Altitude(altitude))
    }
}
