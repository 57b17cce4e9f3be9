//! Collaborator traits at the hardware seam.
//!
//! The agent never talks to a flight controller or SDR directly; it drives
//! these traits.  Production binds them to real hardware, tests bind them to
//! the in-process mocks in `tests.rs`.

use async_trait::async_trait;

use rfs_core::{GeoPoint, SignalMeasurement};
use rfs_proto::Velocity;

use crate::SwarmResult;
use crate::behavior::PredictedMove;

/// Flight-controller abstraction.
///
/// Commands return once accepted by the autopilot, not once complete; the
/// role loops poll [`Vehicle::current_location`] to track progress.
#[async_trait]
pub trait Vehicle: Send + Sync {
    async fn arm(&self) -> SwarmResult<()>;
    async fn takeoff(&self, altitude_m: f64) -> SwarmResult<()>;
    async fn goto(&self, target: GeoPoint, speed_mps: f64) -> SwarmResult<()>;
    async fn land(&self) -> SwarmResult<()>;
    async fn current_location(&self) -> SwarmResult<GeoPoint>;
    /// Battery level, percent.
    async fn battery_level(&self) -> SwarmResult<f64>;
    /// Heading in degrees, 0 = north.
    async fn heading(&self) -> SwarmResult<f64>;
    async fn velocity(&self) -> SwarmResult<Velocity>;
}

/// SDR measurement source for the frequency band this agent scans.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// The newest measurement inside the agent's assigned band, if the
    /// receiver has one.
    async fn latest_measurement(&self) -> SwarmResult<Option<SignalMeasurement>>;
}

/// Feature vector the lead's movement predictor scores candidate moves with.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictorFeatures {
    /// Current RSSI at the pursued frequency, dBm.
    pub rssi:              f64,
    /// RSSI one cycle ago, dBm.
    pub previous_rssi:     f64,
    /// Distance to the current target estimate, metres.
    pub target_distance_m: f64,
    /// Own altitude, metres.
    pub altitude_m:        f64,
}

/// Chooses the lead's next probe move from signal trend and geometry.
///
/// The default heuristic lives in [`GradientPredictor`]; a learned model can
/// be dropped in behind the same trait.
pub trait MovementPredictor: Send + Sync {
    fn predict(&self, features: &PredictorFeatures) -> PredictedMove;
}

/// Hill-climbing heuristic: keep moving while the signal strengthens,
/// sidestep when it weakens, descend when close enough that altitude
/// dominates path loss.
#[derive(Clone, Debug, Default)]
pub struct GradientPredictor;

impl MovementPredictor for GradientPredictor {
    fn predict(&self, features: &PredictorFeatures) -> PredictedMove {
        if features.target_distance_m < 20.0 && features.altitude_m > 20.0 {
            return PredictedMove::Down;
        }
        if features.rssi >= features.previous_rssi {
            PredictedMove::Forward
        } else if features.rssi < features.previous_rssi - 3.0 {
            // Signal dropped sharply; the bearing is likely off.
            PredictedMove::Left
        } else {
            PredictedMove::Right
        }
    }
}
