//! The geolocation engine: method selection, hybrid fallback, and the
//! single-receiver probability ring.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::debug;

use rfs_core::{FrequencyHz, GeoPoint, SignalMeasurement, Timestamp};

use crate::registry::ReceiverRegistry;
use crate::rssi::geolocate_rssi;
use crate::tdoa::{SPEED_OF_LIGHT, calculate_tdoa, geolocate_tdoa};

/// Number of points on the single-receiver probability ring (10° increments).
const RING_POINTS: usize = 36;

/// How a [`GeolocationResult`] was obtained.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeolocationMethod {
    Tdoa,
    Rssi,
    SingleReceiver,
}

/// A fresh position estimate.  Produced per solve; never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeolocationResult {
    pub frequency:      FrequencyHz,
    pub latitude:       f64,
    pub longitude:      f64,
    pub altitude:       f64,
    pub method:         GeolocationMethod,
    /// How many receivers contributed measurements to this solve.
    pub receiver_count: usize,
    pub timestamp:      Timestamp,
}

impl GeolocationResult {
    #[inline]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude, self.altitude)
    }
}

/// One point of the discretized probability ring around a lone receiver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingPoint {
    pub latitude:    f64,
    pub longitude:   f64,
    pub probability: f64,
}

/// Combines the registry with the solvers and picks the strongest method the
/// data supports.
#[derive(Clone, Debug, Default)]
pub struct GeoEngine {
    pub registry: ReceiverRegistry,
}

impl GeoEngine {
    pub fn new(registry: ReceiverRegistry) -> Self {
        Self { registry }
    }

    /// Fill in TDoA values relative to the configured reference receiver.
    /// Without a reference the measurements pass through unchanged.
    pub fn calculate_tdoa(&self, measurements: Vec<SignalMeasurement>) -> Vec<SignalMeasurement> {
        match self.registry.reference() {
            Some(reference) => calculate_tdoa(measurements, reference),
            None => measurements,
        }
    }

    /// TDoA solve against the registry.  See [`geolocate_tdoa`].
    pub fn geolocate_tdoa(
        &self,
        frequency: FrequencyHz,
        measurements: &[SignalMeasurement],
    ) -> Option<GeolocationResult> {
        let position = geolocate_tdoa(measurements, &self.registry, SPEED_OF_LIGHT)?;
        Some(self.result(frequency, position, GeolocationMethod::Tdoa, measurements))
    }

    /// RSSI solve against the registry.  See [`geolocate_rssi`].
    pub fn geolocate_rssi(
        &self,
        frequency: FrequencyHz,
        measurements: &[SignalMeasurement],
    ) -> Option<GeolocationResult> {
        let position = geolocate_rssi(measurements, &self.registry)?;
        Some(self.result(frequency, position, GeolocationMethod::Rssi, measurements))
    }

    /// TDoA when it converges, otherwise RSSI.
    pub fn geolocate_hybrid(
        &self,
        frequency: FrequencyHz,
        measurements: &[SignalMeasurement],
    ) -> Option<GeolocationResult> {
        if let Some(result) = self.geolocate_tdoa(frequency, measurements) {
            return Some(result);
        }
        debug!(%frequency, "TDoA solve unavailable, falling back to RSSI");
        self.geolocate_rssi(frequency, measurements)
    }

    /// Possible transmitter locations from a single receiver's measurement:
    /// a ring of [`RING_POINTS`] equally weighted points at the distance the
    /// inverse-square law implies for `assumed_tx_power`.
    ///
    /// Empty when the measurement's receiver is unknown.
    pub fn estimate_single_receiver(
        &self,
        measurement: &SignalMeasurement,
        assumed_tx_power: f64,
    ) -> Vec<RingPoint> {
        let Some(receiver) = self.registry.get(&measurement.receiver_id) else {
            return Vec::new();
        };

        // Distance ∝ sqrt(tx_power / rx_power); the scale factor is tunable
        // and highly approximate.
        let power = measurement.power.max(0.001);
        let distance = (assumed_tx_power / power).sqrt() * 1_000.0;

        let center = receiver.position();
        (0..RING_POINTS)
            .map(|i| {
                let bearing = TAU * i as f64 / RING_POINTS as f64;
                let point = center.destination(distance, bearing);
                RingPoint {
                    latitude:    point.lat,
                    longitude:   point.lon,
                    probability: 1.0 / RING_POINTS as f64,
                }
            })
            .collect()
    }

    fn result(
        &self,
        frequency: FrequencyHz,
        position: GeoPoint,
        method: GeolocationMethod,
        measurements: &[SignalMeasurement],
    ) -> GeolocationResult {
        GeolocationResult {
            frequency,
            latitude: position.lat,
            longitude: position.lon,
            altitude: position.alt,
            method,
            receiver_count: measurements.len(),
            timestamp: Timestamp::now(),
        }
    }
}
