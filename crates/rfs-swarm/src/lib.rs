//! `rfs-swarm` — the autonomous drone swarm coordination runtime.
//!
//! One [`SwarmAgent`] per drone turns violation reports into a coordinated
//! pursuit: a deterministic election picks a LEAD, supporting roles fly
//! formation stations around the target estimate, and collision avoidance
//! keeps the formation separated.  All coordination rides the broadcast
//! [`Bus`]; hardware hides behind the [`Vehicle`] and [`SignalSource`]
//! traits.
//!
//! # What lives here
//!
//! | Module        | Contents                                               |
//! |---------------|--------------------------------------------------------|
//! | [`config`]    | `AgentConfig`, flight/swarm parameters, self-provisioning |
//! | [`state`]     | `SwarmState` — the agent's local view, newest-wins updates |
//! | [`election`]  | Deterministic leader election and role ranking         |
//! | [`bands`]     | Scan-band partitioning across the swarm                |
//! | [`avoidance`] | Separation checks and evasive maneuver planning        |
//! | [`behavior`]  | Formation waypoint geometry, predictor moves           |
//! | [`traits`]    | `Vehicle`, `SignalSource`, `MovementPredictor` seams   |
//! | [`agent`]     | `SwarmAgent`, the `Bus`, and the loop schedule         |
//! | [`roles`]     | The per-role async behavior loops                      |

pub mod agent;
pub mod avoidance;
pub mod bands;
pub mod behavior;
pub mod config;
pub mod election;
pub mod error;
pub mod roles;
pub mod state;
pub mod traits;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use agent::{
    AgentContext, AgentHandle, Bus, SCOUT_RECENTER_MARGIN_DB, SwarmAgent,
    VIOLATION_THRESHOLD_DBM,
};
pub use avoidance::{AvoidanceManeuver, CollisionRisk, detect_risks, plan_avoidance};
pub use bands::{FREQUENCY_BANDS, assign_bands, band_contains};
pub use behavior::{
    PROBE_ALTITUDE_M, PROBE_DISTANCE_M, PredictedMove, backup_waypoint, best_probe_move,
    scout_waypoint, triangulation_waypoint,
};
pub use config::{
    AgentConfig, FlightParams, MAX_ALTITUDE_M, MIN_ALTITUDE_M, SAFE_ALTITUDE_STEP_M, SwarmParams,
};
pub use election::{Candidate, ElectionOutcome, NO_SIGNAL_RSSI, elect, rank};
pub use error::{SwarmError, SwarmResult};
pub use state::{PeerState, SignalReading, StaleSweep, SwarmState};
pub use traits::{
    GradientPredictor, MovementPredictor, PredictorFeatures, SignalSource, Vehicle,
};
