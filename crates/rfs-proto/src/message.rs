//! Coordination-channel message kinds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rfs_core::{DroneId, FrequencyHz, GeoPoint, Role, Timestamp};

use crate::ProtoResult;

/// A geographic position as it travels on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude:  f64,
    pub longitude: f64,
    pub altitude:  f64,
}

impl From<GeoPoint> for Location {
    fn from(p: GeoPoint) -> Self {
        Self { latitude: p.lat, longitude: p.lon, altitude: p.alt }
    }
}

impl From<Location> for GeoPoint {
    fn from(l: Location) -> Self {
        GeoPoint::new(l.latitude, l.longitude, l.altitude)
    }
}

/// Ground-frame velocity components in m/s.
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// What a registering drone can do.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    pub sdr_enabled:   bool,
    pub tdoa_capable:  bool,
    pub max_altitude:  f64,
    pub max_speed:     f64,
    pub battery_level: f64,
}

/// One `(drone, role)` pair inside a [`SwarmMessage::SwarmRoles`] broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub drone_id: DroneId,
    pub role:     Role,
}

/// Everything that travels over the coordination channel.
///
/// The JSON `type` tag is the snake_case variant name
/// (`drone_status`, `violation_detected`, …).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwarmMessage {
    /// A drone announcing itself to the swarm.
    DroneRegistration {
        drone_id:     DroneId,
        capabilities: Capabilities,
    },

    /// Periodic full-status broadcast (~1 Hz).
    DroneStatus {
        drone_id:         DroneId,
        location:         Location,
        battery:          f64,
        role:             Role,
        is_lead:          bool,
        target_frequency: Option<FrequencyHz>,
        timestamp:        Timestamp,
    },

    /// High-rate position share for collision avoidance.
    DronePosition {
        drone_id:  DroneId,
        location:  Location,
        velocity:  Velocity,
        /// Degrees, 0 = north.
        heading:   f64,
        timestamp: Timestamp,
    },

    /// An unmatched strong signal observed at `frequency`.
    ViolationDetected {
        drone_id:           DroneId,
        frequency:          FrequencyHz,
        rssi:               f64,
        tdoa:               Option<f64>,
        predicted_location: Option<Location>,
        timestamp:          Timestamp,
    },

    /// The elected leader broadcasting everyone's role.
    SwarmRoles {
        leader_id:   DroneId,
        frequency:   FrequencyHz,
        assignments: Vec<RoleAssignment>,
    },

    /// Scan-band partition for the whole swarm.
    FrequencyBandAssignment {
        /// Band edges in Hz per drone.  BTreeMap keeps the wire form stable.
        assignments: BTreeMap<DroneId, (FrequencyHz, FrequencyHz)>,
    },

    /// A drone leaving the pursuit to return home.
    DroneReturning { drone_id: DroneId },

    /// A scout reporting a stronger reading back to the lead.
    ScoutSignal {
        drone_id:  DroneId,
        frequency: FrequencyHz,
        rssi:      f64,
        location:  Location,
    },
}

impl SwarmMessage {
    /// The sender, for every message kind that carries one.
    /// `FrequencyBandAssignment` is swarm-wide and has no single sender.
    pub fn sender(&self) -> Option<&DroneId> {
        match self {
            SwarmMessage::DroneRegistration { drone_id, .. }
            | SwarmMessage::DroneStatus { drone_id, .. }
            | SwarmMessage::DronePosition { drone_id, .. }
            | SwarmMessage::ViolationDetected { drone_id, .. }
            | SwarmMessage::DroneReturning { drone_id }
            | SwarmMessage::ScoutSignal { drone_id, .. } => Some(drone_id),
            SwarmMessage::SwarmRoles { leader_id, .. } => Some(leader_id),
            SwarmMessage::FrequencyBandAssignment { .. } => None,
        }
    }
}

/// Serialize a message to its wire form.
pub fn encode(message: &SwarmMessage) -> ProtoResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode one inbound message.  Callers log-and-drop on error.
pub fn decode(raw: &str) -> ProtoResult<SwarmMessage> {
    Ok(serde_json::from_str(raw)?)
}
