//! Formation geometry for the pursuit roles.
//!
//! All waypoint math is pure and unit-tested here; the async role loops in
//! [`crate::roles`] only pick parameters and issue vehicle commands.

use rfs_core::{GeoPoint, Timestamp};

use crate::config::{MAX_ALTITUDE_M, MIN_ALTITUDE_M, SAFE_ALTITUDE_STEP_M};

/// Lateral nudge for the predictor moves, degrees.
const NUDGE_DEG: f64 = 0.0001;

/// A directional refinement of the lead's pursuit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PredictedMove {
    Forward,
    Left,
    Right,
    Up,
    Down,
}

impl PredictedMove {
    pub const ALL: [PredictedMove; 5] = [
        PredictedMove::Forward,
        PredictedMove::Left,
        PredictedMove::Right,
        PredictedMove::Up,
        PredictedMove::Down,
    ];

    /// Apply this move as a nudge to the target estimate.  Forward keeps the
    /// estimate; lateral moves shift longitude by [`NUDGE_DEG`]; vertical
    /// moves step altitude by [`SAFE_ALTITUDE_STEP_M`], clamped to the
    /// flight envelope.
    pub fn nudge(self, target: GeoPoint) -> GeoPoint {
        match self {
            PredictedMove::Forward => target,
            PredictedMove::Left => GeoPoint::new(target.lat, target.lon - NUDGE_DEG, target.alt),
            PredictedMove::Right => GeoPoint::new(target.lat, target.lon + NUDGE_DEG, target.alt),
            PredictedMove::Up => GeoPoint::new(
                target.lat,
                target.lon,
                (target.alt + SAFE_ALTITUDE_STEP_M).min(MAX_ALTITUDE_M),
            ),
            PredictedMove::Down => GeoPoint::new(
                target.lat,
                target.lon,
                (target.alt - SAFE_ALTITUDE_STEP_M).max(MIN_ALTITUDE_M),
            ),
        }
    }

    /// Apply this move as a small displacement of the drone itself: Forward
    /// steps a tenth of the remaining distance toward the target, the rest
    /// are the same nudges as [`Self::nudge`].
    pub fn apply(self, from: GeoPoint, target: GeoPoint) -> GeoPoint {
        match self {
            PredictedMove::Forward => {
                let bearing = from.bearing_to(target);
                let step = 0.1 * from.surface_distance_m(target);
                from.destination(step, bearing)
            }
            _ => self.nudge(from),
        }
    }
}

/// Horizontal window for the close-range probe, metres.
pub const PROBE_DISTANCE_M: f64 = 50.0;
/// Vertical window for the close-range probe, metres.
pub const PROBE_ALTITUDE_M: f64 = 20.0;

/// Pick the candidate move that most shortens the slant distance to the
/// target — the inverse-square proxy for the best expected RSSI gain.
/// `None` when no move improves on holding position.
pub fn best_probe_move(from: GeoPoint, target: GeoPoint) -> Option<PredictedMove> {
    let current = from.slant_distance_m(target);
    PredictedMove::ALL
        .into_iter()
        .map(|m| (m, m.apply(from, target).slant_distance_m(target)))
        .filter(|(_, d)| *d < current)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(m, _)| m)
}

/// Where the TRIANGULATION drone stands: `formation_radius_m` out from the
/// target, perpendicular (+90°) to the lead→target line.  The perpendicular
/// baseline maximises TDoA geometry against the lead's measurements.
pub fn triangulation_waypoint(
    target: GeoPoint,
    lead: GeoPoint,
    formation_radius_m: f64,
    altitude: f64,
) -> GeoPoint {
    let baseline = lead.bearing_to(target);
    let offset = baseline + std::f64::consts::FRAC_PI_2;
    let mut point = target.destination(formation_radius_m, offset);
    point.alt = altitude;
    point
}

/// Where the BACKUP drone stands: behind the lead along its reported heading
/// + 180°, at three quarters of the formation radius, ready to take over
/// without crowding the baseline.
pub fn backup_waypoint(
    lead: GeoPoint,
    lead_heading_deg: f64,
    formation_radius_m: f64,
    altitude: f64,
) -> GeoPoint {
    let behind = (lead_heading_deg + 180.0).to_radians();
    let mut point = lead.destination(0.75 * formation_radius_m, behind);
    point.alt = altitude;
    point
}

/// Where the SCOUT flies `now`: a point on a circle of `search_radius_m`
/// around the target, advancing one degree of arc per second so the full
/// perimeter is swept every six minutes.
pub fn scout_waypoint(
    target: GeoPoint,
    search_radius_m: f64,
    altitude: f64,
    now: Timestamp,
) -> GeoPoint {
    let angle_deg = (now.0 as u64 % 360) as f64;
    let mut point = target.destination(search_radius_m, angle_deg.to_radians());
    point.alt = altitude;
    point
}
