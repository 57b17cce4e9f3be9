//! Per-agent configuration, self-provisioning on first run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rfs_core::{DroneId, GeoPoint};

use crate::SwarmResult;

/// Lowest commanded flight altitude, metres.
pub const MIN_ALTITUDE_M: f64 = 10.0;
/// Highest commanded flight altitude, metres.
pub const MAX_ALTITUDE_M: f64 = 120.0;
/// Vertical step used by collision avoidance and predictor nudges, metres.
pub const SAFE_ALTITUDE_STEP_M: f64 = 10.0;

/// Flight envelope and home site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightParams {
    /// Default operating altitude, metres.
    pub altitude:      f64,
    /// Cruise speed, m/s.
    pub speed:         f64,
    /// Maximum distance from home before a pursuit is abandoned, metres.
    pub max_distance:  f64,
    pub home_location: GeoPoint,
}

impl Default for FlightParams {
    fn default() -> Self {
        Self {
            altitude:      100.0,
            speed:         10.0,
            max_distance:  2_000.0,
            home_location: GeoPoint::new(37.7749, -122.4194, 0.0),
        }
    }
}

/// Formation and separation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwarmParams {
    /// Minimum horizontal separation between agents, metres.
    pub min_separation_m:          f64,
    /// Minimum vertical separation between agents, metres.
    pub min_vertical_separation_m: f64,
    /// How often to broadcast `drone_position`, seconds.
    pub position_share_interval:   f64,
    /// Distance supporting agents keep from the target, metres.
    pub formation_radius_m:        f64,
    /// Radius of the scout's search circle, metres.
    pub search_radius_m:           f64,
    /// How far above the lead the scout flies, metres.
    pub scout_altitude_offset_m:   f64,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            min_separation_m:          15.0,
            min_vertical_separation_m: 10.0,
            position_share_interval:   1.0,
            formation_radius_m:        100.0,
            search_radius_m:           200.0,
            scout_altitude_offset_m:   20.0,
        }
    }
}

/// Everything one agent needs to join the swarm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub drone_id: DroneId,
    #[serde(default)]
    pub flight:   FlightParams,
    #[serde(default)]
    pub swarm:    SwarmParams,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            drone_id: DroneId::from("drone1"),
            flight:   FlightParams::default(),
            swarm:    SwarmParams::default(),
        }
    }
}

impl AgentConfig {
    /// Load the config file, or write defaults to `path` when it is missing.
    pub fn load_or_create(path: impl AsRef<Path>) -> SwarmResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            let bytes = std::fs::read(path)?;
            let config: Self = serde_json::from_slice(&bytes)?;
            info!(path = %path.display(), drone = %config.drone_id, "loaded agent config");
            Ok(config)
        } else {
            let config = Self::default();
            std::fs::write(path, serde_json::to_vec_pretty(&config)?)?;
            warn!(path = %path.display(), "created default configuration file");
            Ok(config)
        }
    }
}
