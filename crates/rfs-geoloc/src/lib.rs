//! `rfs-geoloc` — signal-source geolocation from distributed receivers.
//!
//! Turns per-receiver [`SignalMeasurement`][rfs_core::SignalMeasurement]s
//! into a transmitter position estimate.  "Not enough data yet" is an
//! expected, frequent condition in a streaming system, so every solver
//! signals failure with `None` rather than an error.
//!
//! # What lives here
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`registry`] | `Receiver`, `ReceiverRegistry`, JSON persistence        |
//! | [`solver`]   | `NelderMead` derivative-free minimizer over (lat, lon, alt) |
//! | [`tdoa`]     | TDoA computation and hyperbolic multilateration         |
//! | [`rssi`]     | Inverse-square-law signal-strength multilateration      |
//! | [`engine`]   | `GeoEngine` combining the methods, hybrid fallback, probability ring |
//! | [`simulate`] | `GeoSimulator` — synthetic receivers and measurements   |

pub mod engine;
pub mod error;
pub mod registry;
pub mod rssi;
pub mod simulate;
pub mod solver;
pub mod tdoa;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use engine::{GeoEngine, GeolocationMethod, GeolocationResult, RingPoint};
pub use error::{GeolocError, GeolocResult};
pub use registry::{Receiver, ReceiverRegistry};
pub use rssi::geolocate_rssi;
pub use simulate::GeoSimulator;
pub use solver::NelderMead;
pub use tdoa::{SPEED_OF_LIGHT, calculate_tdoa, geolocate_tdoa};
