//! Time Difference of Arrival computation and hyperbolic multilateration.

use nalgebra::Vector3;
use rustc_hash::FxHashMap;

use rfs_core::{GeoPoint, ReceiverId, SignalMeasurement};

use crate::registry::ReceiverRegistry;
use crate::solver::NelderMead;

/// Speed of light in metres per second.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Fill in `tdoa` on each measurement relative to the reference receiver's
/// arrival time.  The reference's own tdoa is zero.
///
/// If no measurement exists for `reference`, the set is returned unchanged —
/// insufficient data, not an error.
pub fn calculate_tdoa(
    mut measurements: Vec<SignalMeasurement>,
    reference: &ReceiverId,
) -> Vec<SignalMeasurement> {
    let Some(t0) = measurements
        .iter()
        .find(|m| &m.receiver_id == reference)
        .map(|m| m.timestamp)
    else {
        return measurements;
    };

    for m in &mut measurements {
        m.tdoa = Some(if &m.receiver_id == reference {
            0.0
        } else {
            m.timestamp.0 - t0.0
        });
    }
    measurements
}

/// Hyperbolic multilateration: the position minimizing the sum of squared
/// differences between predicted and measured TDoA.
///
/// Requires measurements with a computed `tdoa` from at least three
/// receivers (reference included) and at least three active receivers.
/// Returns `None` on insufficient data or solver non-convergence.
pub fn geolocate_tdoa(
    measurements: &[SignalMeasurement],
    registry: &ReceiverRegistry,
    speed_of_light: f64,
) -> Option<GeoPoint> {
    let reference = registry.reference()?.clone();

    let active = registry.active_receivers();
    if active.len() < 3 {
        return None;
    }

    // One measurement per receiver; only those with a computed tdoa and a
    // known receiver participate.
    let mut by_receiver: FxHashMap<&ReceiverId, &SignalMeasurement> = FxHashMap::default();
    for m in measurements {
        if m.tdoa.is_some() && registry.get(&m.receiver_id).is_some() {
            by_receiver.insert(&m.receiver_id, m);
        }
    }
    if by_receiver.len() < 3 || !by_receiver.contains_key(&reference) {
        return None;
    }

    let ref_position = registry.get(&reference)?.position();

    let cost = |coords: Vector3<f64>| -> f64 {
        let hypothesis = GeoPoint::new(coords.x, coords.y, coords.z);
        let ref_distance = hypothesis.slant_distance_m(ref_position);

        let mut error_sum = 0.0;
        for (receiver_id, measurement) in &by_receiver {
            if **receiver_id == reference {
                continue;
            }
            // Receiver existence was checked when building the map.
            let Some(receiver) = registry.get(receiver_id) else {
                continue;
            };
            let distance = hypothesis.slant_distance_m(receiver.position());
            let predicted_tdoa = (distance - ref_distance) / speed_of_light;
            let measured = measurement.tdoa.unwrap_or(0.0);
            error_sum += (predicted_tdoa - measured).powi(2);
        }
        error_sum
    };

    // Initial guess: centroid of the active receivers.
    let n = active.len() as f64;
    let start = Vector3::new(
        active.iter().map(|r| r.latitude).sum::<f64>() / n,
        active.iter().map(|r| r.longitude).sum::<f64>() / n,
        active.iter().map(|r| r.altitude).sum::<f64>() / n,
    );

    NelderMead::default()
        .minimize(cost, start)
        .map(|v| GeoPoint::new(v.x, v.y, v.z))
}
