//! Synthetic receivers and measurements for exercising the solvers without
//! radio hardware.

use std::f64::consts::TAU;

use rand::Rng;

use rfs_core::{FrequencyHz, GeoPoint, SignalMeasurement, Timestamp};

use crate::registry::Receiver;
use crate::tdoa::SPEED_OF_LIGHT;

/// Generates receiver networks and the measurements a transmitter at a known
/// position would produce at them.
#[derive(Clone, Debug)]
pub struct GeoSimulator {
    pub speed_of_light: f64,
}

impl Default for GeoSimulator {
    fn default() -> Self {
        Self { speed_of_light: SPEED_OF_LIGHT }
    }
}

impl GeoSimulator {
    /// `count` receivers: "R0" at the center, the rest ("R1"…) spread on a
    /// circle of `radius_km` around it.
    pub fn generate_receivers(&self, center: GeoPoint, radius_km: f64, count: usize) -> Vec<Receiver> {
        let mut receivers = Vec::with_capacity(count);
        if count == 0 {
            return receivers;
        }
        receivers.push(Receiver::new("R0", center.lat, center.lon, 0.0));

        for i in 1..count {
            let bearing = TAU * i as f64 / (count - 1) as f64;
            let point = center.destination(radius_km * 1_000.0, bearing);
            receivers.push(Receiver::new(format!("R{i}"), point.lat, point.lon, 0.0));
        }
        receivers
    }

    /// Measurements each receiver would record for a transmitter at
    /// `transmitter` with normalized power `power`.
    ///
    /// `noise_level` is the standard deviation of the power noise;
    /// `time_error` the standard deviation of the timing error in seconds.
    /// Both may be zero for noiseless data.  Received power follows the
    /// inverse-square law, clamped to `[0.001, 1.0]`; SNR is taken against a
    /// 0.01 background-noise floor.
    pub fn simulate_measurements<R: Rng>(
        &self,
        transmitter: GeoPoint,
        frequency:   FrequencyHz,
        power:       f64,
        receivers:   &[Receiver],
        noise_level: f64,
        time_error:  f64,
        rng:         &mut R,
    ) -> Vec<SignalMeasurement> {
        let base_time = Timestamp::now();

        receivers
            .iter()
            .map(|receiver| {
                let distance = receiver.position().slant_distance_m(transmitter);
                let travel_time = distance / self.speed_of_light;
                let measured_time = base_time.0 + travel_time + gaussian(rng, time_error);

                let received_power = (power / (distance * distance)
                    + gaussian(rng, noise_level))
                .clamp(0.001, 1.0);

                let background_noise = 0.01;
                let snr = 10.0 * (received_power / background_noise).log10();

                let mut m = SignalMeasurement::new(
                    receiver.id.clone(),
                    frequency,
                    received_power,
                    Timestamp(measured_time),
                );
                m.snr = Some(snr);
                m
            })
            .collect()
    }
}

/// Box–Muller sample from N(0, sigma).
fn gaussian<R: Rng>(rng: &mut R, sigma: f64) -> f64 {
    if sigma == 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    sigma * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
