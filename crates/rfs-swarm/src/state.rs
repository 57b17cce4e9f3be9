//! One agent's local view of the swarm.
//!
//! Exactly one authoritative copy of self state lives here; everything about
//! peers is a timestamped snapshot.  Peer entries are evicted after
//! [`PEER_STALE_SECS`] without an update — a weak reference with lookup,
//! never an ownership relation.
//!
//! Single-writer rule: only the agent's own receive loop mutates this struct
//! (behavior loops read it), so field updates need no finer locking than the
//! one `RwLock` the agent wraps it in.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::debug;

use rfs_core::{
    DroneId, FrequencyHz, GeoPoint, MEASUREMENT_WINDOW_SECS, PEER_STALE_SECS, ReceiverId, Role,
    SignalMeasurement, Timestamp,
};
use rfs_proto::Velocity;

use crate::election::{Candidate, NO_SIGNAL_RSSI};

/// Timestamped snapshot of one peer.
///
/// Position and status arrive in different messages at different rates, so
/// each field group keeps its own freshness stamp; the newest timestamp per
/// group wins and out-of-order delivery is a no-op.
#[derive(Clone, Debug, Default)]
pub struct PeerState {
    pub location:         Option<GeoPoint>,
    pub velocity:         Option<Velocity>,
    /// Degrees, 0 = north.
    pub heading:          Option<f64>,
    pub battery:          Option<f64>,
    pub role:             Role,
    pub is_lead:          bool,
    pub target_frequency: Option<FrequencyHz>,
    /// Latest RSSI this peer reported per frequency (violation or scout
    /// messages), dBm.
    pub reported_rssi:    FxHashMap<FrequencyHz, f64>,
    position_updated:     Timestamp,
    status_updated:       Timestamp,
}

impl PeerState {
    /// Newest update of either field group.
    #[inline]
    pub fn last_update(&self) -> Timestamp {
        if self.position_updated.0 >= self.status_updated.0 {
            self.position_updated
        } else {
            self.status_updated
        }
    }

    #[inline]
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        !self.last_update().is_stale(now, PEER_STALE_SECS)
    }
}

/// The latest signal evidence at one frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalReading {
    pub rssi:               f64,
    pub tdoa:               Option<f64>,
    pub predicted_location: Option<GeoPoint>,
    pub timestamp:          Timestamp,
}

/// Result of a stale-peer sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaleSweep {
    pub removed:   Vec<DroneId>,
    /// The acting lead of our active pursuit went silent — re-elect.
    pub lead_lost: bool,
}

/// The agent's complete local view: authoritative self state plus peer
/// snapshots, signal readings, and the measurement window feeding the solver.
#[derive(Clone, Debug)]
pub struct SwarmState {
    pub drone_id:         DroneId,
    pub role:             Role,
    pub is_lead:          bool,
    pub pursuing:         bool,
    pub target_frequency: Option<FrequencyHz>,
    pub target_location:  Option<GeoPoint>,
    pub leader_id:        Option<DroneId>,
    /// Set while an evasive maneuver is in flight; prevents overlapping
    /// avoidance commands.
    pub evasive_maneuver: bool,
    pub peers:            FxHashMap<DroneId, PeerState>,
    pub signals:          FxHashMap<FrequencyHz, SignalReading>,
    pub band_assignments: BTreeMap<DroneId, (FrequencyHz, FrequencyHz)>,
    /// Sliding window of per-receiver measurements for multilateration.
    measurements: FxHashMap<FrequencyHz, FxHashMap<ReceiverId, SignalMeasurement>>,
}

impl SwarmState {
    pub fn new(drone_id: DroneId) -> Self {
        Self {
            drone_id,
            role: Role::Unassigned,
            is_lead: false,
            pursuing: false,
            target_frequency: None,
            target_location: None,
            leader_id: None,
            evasive_maneuver: false,
            peers: FxHashMap::default(),
            signals: FxHashMap::default(),
            band_assignments: BTreeMap::default(),
            measurements: FxHashMap::default(),
        }
    }

    // ── Peer updates (receive loop only) ──────────────────────────────────

    /// Create (or refresh) a peer entry from its registration, stamped now
    /// so the stale sweep does not race the peer's first status broadcast.
    pub fn register_peer(&mut self, drone_id: &DroneId, now: Timestamp) {
        if *drone_id == self.drone_id {
            return;
        }
        let peer = self.peers.entry(drone_id.clone()).or_default();
        if now.0 > peer.status_updated.0 {
            peer.status_updated = now;
        }
    }

    /// Apply a `drone_position` message.  Older-than-known timestamps are
    /// dropped; duplicates are no-ops.
    pub fn apply_position(
        &mut self,
        drone_id: &DroneId,
        location: GeoPoint,
        velocity: Velocity,
        heading: f64,
        timestamp: Timestamp,
    ) {
        if *drone_id == self.drone_id {
            return;
        }
        let peer = self.peers.entry(drone_id.clone()).or_default();
        if timestamp.0 < peer.position_updated.0 {
            debug!(%drone_id, "dropping out-of-order position update");
            return;
        }
        peer.location = Some(location);
        peer.velocity = Some(velocity);
        peer.heading = Some(heading);
        peer.position_updated = timestamp;
    }

    /// Apply a `drone_status` message under the same newest-wins rule.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_status(
        &mut self,
        drone_id: &DroneId,
        location: GeoPoint,
        battery: f64,
        role: Role,
        is_lead: bool,
        target_frequency: Option<FrequencyHz>,
        timestamp: Timestamp,
    ) {
        if *drone_id == self.drone_id {
            return;
        }
        let peer = self.peers.entry(drone_id.clone()).or_default();
        if timestamp.0 < peer.status_updated.0 {
            debug!(%drone_id, "dropping out-of-order status update");
            return;
        }
        peer.location = Some(location);
        peer.battery = Some(battery);
        peer.role = role;
        peer.is_lead = is_lead;
        peer.target_frequency = target_frequency;
        peer.status_updated = timestamp;
    }

    /// Record the RSSI a peer reported at `frequency`.
    pub fn note_peer_rssi(&mut self, drone_id: &DroneId, frequency: FrequencyHz, rssi: f64) {
        if *drone_id == self.drone_id {
            return;
        }
        self.peers
            .entry(drone_id.clone())
            .or_default()
            .reported_rssi
            .insert(frequency, rssi);
    }

    /// Evict peers that have gone silent.  Flags `lead_lost` when the acting
    /// lead of an active pursuit was among them.
    pub fn evict_stale(&mut self, now: Timestamp) -> StaleSweep {
        let mut sweep = StaleSweep::default();
        let stale: Vec<DroneId> = self
            .peers
            .iter()
            .filter(|(_, p)| !p.is_fresh(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in stale {
            let Some(peer) = self.peers.remove(&id) else {
                continue;
            };
            let was_lead = peer.is_lead || self.leader_id.as_ref() == Some(&id);
            if was_lead && self.pursuing {
                sweep.lead_lost = true;
                self.leader_id = None;
            }
            sweep.removed.push(id);
        }
        sweep
    }

    /// Peers with a fresh position fix, for collision checks.
    pub fn fresh_peers(&self, now: Timestamp) -> impl Iterator<Item = (&DroneId, &PeerState)> {
        self.peers
            .iter()
            .filter(move |(_, p)| p.is_fresh(now) && p.location.is_some())
    }

    /// The peer currently acting as lead, if any.
    pub fn lead_peer(&self) -> Option<(&DroneId, &PeerState)> {
        self.peers.iter().find(|(_, p)| p.is_lead)
    }

    // ── Signal evidence ───────────────────────────────────────────────────

    /// Record signal evidence at `frequency`, newest timestamp wins.
    pub fn record_signal(&mut self, frequency: FrequencyHz, reading: SignalReading) {
        match self.signals.get(&frequency) {
            Some(existing) if existing.timestamp.0 > reading.timestamp.0 => {}
            _ => {
                self.signals.insert(frequency, reading);
            }
        }
    }

    /// Add one receiver's measurement to the multilateration window.
    pub fn record_measurement(&mut self, measurement: SignalMeasurement) {
        self.measurements
            .entry(measurement.frequency)
            .or_default()
            .insert(measurement.receiver_id.clone(), measurement);
    }

    /// The current measurement window at `frequency`, stale entries excluded.
    pub fn measurement_window(&self, frequency: FrequencyHz, now: Timestamp) -> Vec<SignalMeasurement> {
        self.measurements
            .get(&frequency)
            .map(|by_receiver| {
                by_receiver
                    .values()
                    .filter(|m| !m.timestamp.is_stale(now, MEASUREMENT_WINDOW_SECS))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop measurements and readings older than the sliding window.
    pub fn prune_window(&mut self, now: Timestamp) {
        for by_receiver in self.measurements.values_mut() {
            by_receiver.retain(|_, m| !m.timestamp.is_stale(now, MEASUREMENT_WINDOW_SECS));
        }
        self.measurements.retain(|_, by_receiver| !by_receiver.is_empty());
        self.signals
            .retain(|_, r| !r.timestamp.is_stale(now, MEASUREMENT_WINDOW_SECS));
    }

    // ── Election support ──────────────────────────────────────────────────

    /// Candidate snapshot for an election at `frequency`: self plus every
    /// known peer.  Self's RSSI comes from its own latest reading (default
    /// −100), peers' from what they last reported.
    pub fn candidates(&self, frequency: FrequencyHz, self_battery: f64) -> Vec<Candidate> {
        let mut candidates = vec![Candidate {
            drone_id: self.drone_id.clone(),
            rssi: self
                .signals
                .get(&frequency)
                .map(|r| r.rssi)
                .unwrap_or(NO_SIGNAL_RSSI),
            battery: self_battery,
        }];

        for (id, peer) in &self.peers {
            candidates.push(Candidate {
                drone_id: id.clone(),
                rssi: peer
                    .reported_rssi
                    .get(&frequency)
                    .copied()
                    .unwrap_or(NO_SIGNAL_RSSI),
                battery: peer.battery.unwrap_or(0.0),
            });
        }
        candidates
    }

    // ── Pursuit lifecycle ─────────────────────────────────────────────────

    /// Enter a pursuit with the given role.
    pub fn begin_pursuit(&mut self, role: Role, frequency: FrequencyHz) {
        self.role = role;
        self.is_lead = role == Role::Lead;
        self.pursuing = true;
        self.target_frequency = Some(frequency);
        if self.is_lead {
            self.leader_id = Some(self.drone_id.clone());
        }
    }

    /// Leave the pursuit: role and targets reset to the unassigned state.
    pub fn clear_pursuit(&mut self) {
        self.role = Role::Unassigned;
        self.is_lead = false;
        self.pursuing = false;
        self.target_frequency = None;
        self.target_location = None;
        self.leader_id = None;
    }
}
