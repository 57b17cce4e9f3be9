//! Wall-clock timestamps and staleness windows.
//!
//! The coordination protocol is idempotent per `(drone_id, field)`: the
//! newest timestamp wins, so out-of-order or duplicate delivery cannot
//! corrupt state.  That makes a plain Unix-seconds `f64` sufficient — no
//! vector clocks, no monotonic session counters.

use std::time::{SystemTime, UNIX_EPOCH};

/// Peer entries older than this are evicted from swarm state.
pub const PEER_STALE_SECS: f64 = 10.0;

/// Measurements older than this are dropped from the multilateration window.
pub const MEASUREMENT_WINDOW_SECS: f64 = 10.0;

/// A Unix timestamp in fractional seconds.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default,
         serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub f64);

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self(secs)
    }

    /// Seconds elapsed from `self` to `now`.  Negative if `self` is in the
    /// future (clock skew between agents); callers treat negative as fresh.
    #[inline]
    pub fn age_secs(self, now: Timestamp) -> f64 {
        now.0 - self.0
    }

    /// `true` once this timestamp is older than `window_secs`.
    #[inline]
    pub fn is_stale(self, now: Timestamp, window_secs: f64) -> bool {
        self.age_secs(now) > window_secs
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}
