//! Known receivers and the TDoA reference selection.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use rfs_core::{GeoPoint, ReceiverId, Timestamp};

use crate::{GeolocError, GeolocResult};

/// An SDR receiver with known coordinates — a fixed site or a drone mount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub id:        ReceiverId,
    pub latitude:  f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude:  f64,
    #[serde(default)]
    pub last_seen: Timestamp,
    #[serde(default = "default_active")]
    pub active:    bool,
}

fn default_active() -> bool {
    true
}

impl Receiver {
    pub fn new(id: impl Into<ReceiverId>, latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            altitude,
            last_seen: Timestamp::default(),
            active: true,
        }
    }

    #[inline]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude, self.altitude)
    }

    /// Slant distance in metres to another receiver.
    pub fn distance_to(&self, other: &Receiver) -> f64 {
        self.position().slant_distance_m(other.position())
    }
}

/// Owns the set of known receivers and the TDoA reference choice.
///
/// Invariant: the reference, if set, exists in the registry.  The first
/// receiver added becomes the reference by default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReceiverRegistry {
    receivers: FxHashMap<ReceiverId, Receiver>,
    #[serde(rename = "reference_receiver")]
    reference: Option<ReceiverId>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a receiver.  The first receiver added becomes the
    /// TDoA reference.
    pub fn add(&mut self, receiver: Receiver) {
        let id = receiver.id.clone();
        self.receivers.insert(id.clone(), receiver);
        if self.reference.is_none() {
            self.reference = Some(id);
        }
    }

    /// Remove a receiver.  If it was the reference, an arbitrary remaining
    /// receiver takes over; with none left the reference becomes unset.
    pub fn remove(&mut self, id: &ReceiverId) {
        if self.receivers.remove(id).is_none() {
            return;
        }
        if self.reference.as_ref() == Some(id) {
            self.reference = self.receivers.keys().next().cloned();
        }
    }

    /// Set the TDoA reference.  Returns `false` if the id is unknown.
    pub fn set_reference(&mut self, id: &ReceiverId) -> bool {
        if self.receivers.contains_key(id) {
            self.reference = Some(id.clone());
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn reference(&self) -> Option<&ReceiverId> {
        self.reference.as_ref()
    }

    #[inline]
    pub fn get(&self, id: &ReceiverId) -> Option<&Receiver> {
        self.receivers.get(id)
    }

    pub fn active_receivers(&self) -> Vec<&Receiver> {
        self.receivers.values().filter(|r| r.active).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    // ── Persistence ───────────────────────────────────────────────────────

    /// Load a registry from a JSON file written by [`save`][Self::save].
    pub fn load(path: impl AsRef<Path>) -> GeolocResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let registry: Self = serde_json::from_slice(&bytes)?;
        info!(receivers = registry.len(), "loaded receiver registry");
        Ok(registry)
    }

    /// Write the registry (receivers and reference id) to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> GeolocResult<()> {
        let json = serde_json::to_vec_pretty(self).map_err(GeolocError::Json)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
