//! Simulated hardware bindings for the node binary.
//!
//! `SimVehicle` integrates commanded waypoints at cruise speed between polls;
//! `SimSdr` synthesizes measurements of a fixed emitter from the vehicle's
//! current position.  Together they let a whole swarm fly in one process.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::sync::Mutex;

use rfs_core::{FrequencyHz, GeoPoint, SignalMeasurement};
use rfs_geoloc::{GeoSimulator, Receiver};
use rfs_proto::Velocity;
use rfs_swarm::{SignalSource, SwarmResult, Vehicle};

/// The transmitter the simulated swarm hunts.
#[derive(Copy, Clone, Debug)]
pub struct Emitter {
    pub location:  GeoPoint,
    pub frequency: FrequencyHz,
    /// Normalized transmit power.
    pub power:     f64,
}

struct VehicleState {
    location:  GeoPoint,
    target:    Option<GeoPoint>,
    heading:   f64,
    last_poll: Instant,
}

/// A kinematic stand-in for a flight controller: flies straight lines toward
/// the last commanded waypoint at a fixed cruise speed.
pub struct SimVehicle {
    state: Mutex<VehicleState>,
    speed: f64,
}

impl SimVehicle {
    pub fn new(start: GeoPoint, speed_mps: f64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(VehicleState {
                location:  start,
                target:    None,
                heading:   0.0,
                last_poll: Instant::now(),
            }),
            speed: speed_mps,
        })
    }

    /// Advance the position toward the target by elapsed wall time.
    fn advance(&self, state: &mut VehicleState) {
        let elapsed = state.last_poll.elapsed().as_secs_f64();
        state.last_poll = Instant::now();

        let Some(target) = state.target else {
            return;
        };
        let distance = state.location.surface_distance_m(target);
        let step = self.speed * elapsed;

        if step >= distance {
            state.location = target;
            state.target = None;
            return;
        }
        let bearing = state.location.bearing_to(target);
        state.heading = bearing.to_degrees().rem_euclid(360.0);
        let alt_fraction = step / distance;
        let mut next = state.location.destination(step, bearing);
        next.alt = state.location.alt + (target.alt - state.location.alt) * alt_fraction;
        state.location = next;
    }
}

#[async_trait]
impl Vehicle for SimVehicle {
    async fn arm(&self) -> SwarmResult<()> {
        Ok(())
    }

    async fn takeoff(&self, altitude_m: f64) -> SwarmResult<()> {
        self.state.lock().await.location.alt = altitude_m;
        Ok(())
    }

    async fn goto(&self, target: GeoPoint, _speed_mps: f64) -> SwarmResult<()> {
        self.state.lock().await.target = Some(target);
        Ok(())
    }

    async fn land(&self) -> SwarmResult<()> {
        let mut state = self.state.lock().await;
        state.target = None;
        state.location.alt = 0.0;
        Ok(())
    }

    async fn current_location(&self) -> SwarmResult<GeoPoint> {
        let mut state = self.state.lock().await;
        self.advance(&mut state);
        Ok(state.location)
    }

    async fn battery_level(&self) -> SwarmResult<f64> {
        Ok(90.0)
    }

    async fn heading(&self) -> SwarmResult<f64> {
        Ok(self.state.lock().await.heading)
    }

    async fn velocity(&self) -> SwarmResult<Velocity> {
        let state = self.state.lock().await;
        let speed = if state.target.is_some() { self.speed } else { 0.0 };
        let heading = state.heading.to_radians();
        Ok(Velocity {
            x: speed * heading.sin(),
            y: speed * heading.cos(),
            z: 0.0,
        })
    }
}

/// Synthesizes what this drone's SDR would hear from the emitter at the
/// vehicle's current position.
pub struct SimSdr {
    receiver_id: String,
    vehicle:     Arc<SimVehicle>,
    emitter:     Emitter,
    simulator:   GeoSimulator,
    noise_level: f64,
    time_error:  f64,
    rng:         Mutex<SmallRng>,
}

impl SimSdr {
    pub fn new(receiver_id: &str, vehicle: Arc<SimVehicle>, emitter: Emitter, seed: u64) -> Arc<Self> {
        Arc::new(Self {
            receiver_id: receiver_id.to_owned(),
            vehicle,
            emitter,
            simulator: GeoSimulator::default(),
            noise_level: 1e-9,
            time_error: 1e-9,
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        })
    }
}

#[async_trait]
impl SignalSource for SimSdr {
    async fn latest_measurement(&self) -> SwarmResult<Option<SignalMeasurement>> {
        let location = self.vehicle.current_location().await?;
        let receiver = Receiver::new(
            self.receiver_id.as_str(),
            location.lat,
            location.lon,
            location.alt,
        );

        let mut rng = self.rng.lock().await;
        let measurements = self.simulator.simulate_measurements(
            self.emitter.location,
            self.emitter.frequency,
            self.emitter.power,
            std::slice::from_ref(&receiver),
            self.noise_level,
            self.time_error,
            &mut *rng,
        );
        Ok(measurements.into_iter().next())
    }
}
