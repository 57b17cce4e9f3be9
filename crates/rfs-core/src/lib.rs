//! `rfs-core` — foundational types for the `rfswarm` signal-pursuit framework.
//!
//! This crate is a dependency of every other `rfs-*` crate.  It intentionally
//! has no `rfs-*` dependencies and a single external one (`serde` — the
//! coordination protocol is JSON, so derives are always on).
//!
//! # What lives here
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`ids`]      | `DroneId`, `ReceiverId`, `FrequencyHz`                  |
//! | [`geo`]      | `GeoPoint`, haversine/slant distance, bearing, forward problem |
//! | [`time`]     | `Timestamp` (Unix seconds), staleness constants         |
//! | [`signal`]   | `SignalMeasurement`                                     |
//! | [`role`]     | `Role` enum and its collision-priority order            |

pub mod geo;
pub mod ids;
pub mod role;
pub mod signal;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use geo::GeoPoint;
pub use ids::{DroneId, FrequencyHz, ReceiverId};
pub use role::{PURSUIT_ROLES, Role};
pub use signal::SignalMeasurement;
pub use time::{MEASUREMENT_WINDOW_SECS, PEER_STALE_SECS, Timestamp};
