//! Signal-strength multilateration with an inverse-square propagation model.

use nalgebra::Vector3;
use rustc_hash::FxHashMap;

use rfs_core::{GeoPoint, ReceiverId, SignalMeasurement};

use crate::registry::{Receiver, ReceiverRegistry};
use crate::solver::NelderMead;

/// Estimate the transmitter position from received power alone.
///
/// Expected power is `1/d²`, normalized so expected power is 1 at one metre.
/// Residuals are weighted `10^(snr/10)` when the measurement carries an SNR.
/// Less accurate than TDoA but needs no time synchronization.
///
/// Requires at least three measurements; returns `None` below that threshold,
/// when total measured power is zero, or on non-convergence.
pub fn geolocate_rssi(
    measurements: &[SignalMeasurement],
    registry: &ReceiverRegistry,
) -> Option<GeoPoint> {
    if measurements.len() < 3 {
        return None;
    }

    let receivers: FxHashMap<&ReceiverId, &Receiver> = registry
        .active_receivers()
        .into_iter()
        .map(|r| (&r.id, r))
        .collect();

    let cost = |coords: Vector3<f64>| -> f64 {
        let hypothesis = GeoPoint::new(coords.x, coords.y, coords.z);
        let mut error_sum = 0.0;

        for measurement in measurements {
            let Some(receiver) = receivers.get(&measurement.receiver_id) else {
                continue;
            };
            let distance = hypothesis.slant_distance_m(receiver.position());
            let expected_power = 1.0 / (distance * distance);

            let weight = match measurement.snr {
                // Higher SNR means a more reliable measurement.
                Some(snr) => 10f64.powf(snr / 10.0),
                None => 1.0,
            };
            error_sum += weight * (expected_power - measurement.power).powi(2);
        }
        error_sum
    };

    // Initial guess: receiver centroid weighted by received power.
    let total_power: f64 = measurements.iter().map(|m| m.power).sum();
    if total_power == 0.0 {
        return None;
    }

    let mut start = Vector3::zeros();
    for measurement in measurements {
        let Some(receiver) = receivers.get(&measurement.receiver_id) else {
            continue;
        };
        let weight = measurement.power / total_power;
        start.x += receiver.latitude * weight;
        start.y += receiver.longitude * weight;
        start.z += receiver.altitude * weight;
    }

    NelderMead::default()
        .minimize(cost, start)
        .map(|v| GeoPoint::new(v.x, v.y, v.z))
}
