//! Role behavior loops.
//!
//! Each assigned role runs one async loop at 1 Hz until its cancellation
//! token fires; `tokio::select!` makes cancellation effective at every await
//! point, so a role switch never leaves a half-issued command sequence
//! running.  Every cycle starts with the same two guards — range-from-home
//! and collision avoidance — before the role-specific move.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rfs_core::{FrequencyHz, GeoPoint, Role, Timestamp};
use rfs_proto::{Location, SwarmMessage};

use crate::SwarmResult;
use crate::agent::AgentContext;
use crate::avoidance::{AvoidanceManeuver, detect_risks, plan_avoidance};
use crate::behavior::{
    PROBE_ALTITUDE_M, PROBE_DISTANCE_M, backup_waypoint, best_probe_move, scout_waypoint,
    triangulation_waypoint,
};
use crate::config::{MAX_ALTITUDE_M, MIN_ALTITUDE_M};
use crate::traits::PredictorFeatures;

const CYCLE: std::time::Duration = std::time::Duration::from_secs(1);

/// Drive the loop for `role` until `cancel` fires.
pub async fn run_role(
    ctx: Arc<AgentContext>,
    role: Role,
    frequency: FrequencyHz,
    cancel: CancellationToken,
) {
    info!(?role, %frequency, "role loop starting");
    let result = match role {
        Role::Lead => lead_loop(&ctx, frequency, &cancel).await,
        Role::Triangulation => triangulation_loop(&ctx, frequency, &cancel).await,
        Role::Backup => backup_loop(&ctx, frequency, &cancel).await,
        Role::Scout => scout_loop(&ctx, frequency, &cancel).await,
        Role::Unassigned => Ok(()),
    };
    if let Err(e) = result {
        warn!(?role, error = %e, "role loop exited with error");
    }
    info!(?role, "role loop stopped");
}

// ── Shared guards ─────────────────────────────────────────────────────────

/// `true` when the agent has strayed past its range envelope and is now
/// heading home; the caller must stop its loop.
async fn range_guard(ctx: &AgentContext, location: GeoPoint) -> SwarmResult<bool> {
    let home = ctx.config.flight.home_location;
    if location.surface_distance_m(home) > ctx.config.flight.max_distance {
        warn!("range limit exceeded, abandoning pursuit");
        ctx.return_to_home().await?;
        return Ok(true);
    }
    Ok(false)
}

/// Detect separation violations and issue at most one evasive command.
/// Returns `true` while a maneuver is in flight so the role move is skipped.
async fn avoidance_guard(ctx: &AgentContext, role: Role, location: GeoPoint) -> SwarmResult<bool> {
    let now = Timestamp::now();
    let risks = {
        let state = ctx.state.read().await;
        detect_risks(&state, location, &ctx.config.swarm, now)
    };

    if risks.is_empty() {
        ctx.state.write().await.evasive_maneuver = false;
        return Ok(false);
    }
    if ctx.state.read().await.evasive_maneuver {
        return Ok(true);
    }

    // Yield to the closest conflicting peer first.
    let Some(nearest) = risks
        .iter()
        .min_by(|a, b| a.horizontal_m.total_cmp(&b.horizontal_m))
    else {
        return Ok(false);
    };
    let Some(maneuver) =
        plan_avoidance(role, location, nearest, ctx.config.swarm.min_separation_m)
    else {
        // Peer has lower priority; it yields.
        return Ok(false);
    };

    ctx.state.write().await.evasive_maneuver = true;
    match maneuver {
        AvoidanceManeuver::Lateral(target) => {
            ctx.vehicle.goto(target, ctx.config.flight.speed).await?;
        }
        AvoidanceManeuver::Altitude(altitude) => {
            let target = GeoPoint::new(location.lat, location.lon, altitude);
            ctx.vehicle.goto(target, ctx.config.flight.speed).await?;
        }
    }
    Ok(true)
}

// ── Role loops ────────────────────────────────────────────────────────────

/// LEAD: keep the target estimate fresh via the hybrid solver, refine it
/// with the movement predictor, close on it, and probe for the best signal
/// gain once inside the close-range window.
async fn lead_loop(
    ctx: &AgentContext,
    frequency: FrequencyHz,
    cancel: &CancellationToken,
) -> SwarmResult<()> {
    let mut interval = tokio::time::interval(CYCLE);
    let mut previous_rssi = f64::NEG_INFINITY;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = interval.tick() => {}
        }

        let location = ctx.vehicle.current_location().await?;
        if range_guard(ctx, location).await? {
            return Ok(());
        }
        if avoidance_guard(ctx, Role::Lead, location).await? {
            continue;
        }

        // Refresh the estimate; a failed solve keeps the previous one and
        // must not take the pursuit down with it.
        if let Err(e) = ctx.resolve_target(frequency, location).await {
            warn!(error = %e, "target solve failed, keeping previous estimate");
        }

        let (target, rssi) = {
            let state = ctx.state.read().await;
            let rssi = state
                .signals
                .get(&frequency)
                .map(|r| r.rssi)
                .unwrap_or(f64::NEG_INFINITY);
            (state.target_location, rssi)
        };
        let Some(target) = target else {
            debug!("no target estimate yet, holding");
            continue;
        };

        let distance = location.surface_distance_m(target);
        let features = PredictorFeatures {
            rssi,
            previous_rssi,
            target_distance_m: distance,
            altitude_m: location.alt,
        };
        // Predictor refines the estimate; the nudged target is what we fly at.
        let target = ctx
            .predictor
            .predict(&features)
            .nudge(target)
            .clamp_alt(MIN_ALTITUDE_M, MAX_ALTITUDE_M);

        let close = distance < PROBE_DISTANCE_M
            && (location.alt - target.alt).abs() < PROBE_ALTITUDE_M;
        if close {
            // Close-range: probe the candidate moves and take the one with
            // the best expected signal gain; hold if none improves.
            if let Some(probe) = best_probe_move(location, target) {
                debug!(distance_m = distance, ?probe, "probing toward emitter");
                ctx.vehicle
                    .goto(probe.apply(location, target), ctx.config.flight.speed)
                    .await?;
            }
        } else {
            let mut approach = target;
            approach.alt = ctx.config.flight.altitude;
            ctx.vehicle.goto(approach, ctx.config.flight.speed).await?;
        }
        previous_rssi = rssi;
    }
}

/// TRIANGULATION: hold the perpendicular-baseline station off the target.
async fn triangulation_loop(
    ctx: &AgentContext,
    _frequency: FrequencyHz,
    cancel: &CancellationToken,
) -> SwarmResult<()> {
    let mut interval = tokio::time::interval(CYCLE);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = interval.tick() => {}
        }

        let location = ctx.vehicle.current_location().await?;
        if range_guard(ctx, location).await? {
            return Ok(());
        }
        if avoidance_guard(ctx, Role::Triangulation, location).await? {
            continue;
        }

        let station = {
            let state = ctx.state.read().await;
            match (state.target_location, state.lead_peer().and_then(|(_, p)| p.location)) {
                (Some(target), Some(lead)) => Some(triangulation_waypoint(
                    target,
                    lead,
                    ctx.config.swarm.formation_radius_m,
                    ctx.config.flight.altitude,
                )),
                _ => None,
            }
        };
        if let Some(station) = station {
            ctx.vehicle.goto(station, ctx.config.flight.speed).await?;
        }
    }
}

/// BACKUP: shadow the lead from behind its heading, ready to take over.
async fn backup_loop(
    ctx: &AgentContext,
    _frequency: FrequencyHz,
    cancel: &CancellationToken,
) -> SwarmResult<()> {
    let mut interval = tokio::time::interval(CYCLE);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = interval.tick() => {}
        }

        let location = ctx.vehicle.current_location().await?;
        if range_guard(ctx, location).await? {
            return Ok(());
        }
        if avoidance_guard(ctx, Role::Backup, location).await? {
            continue;
        }

        let station = {
            let state = ctx.state.read().await;
            state.lead_peer().and_then(|(_, lead)| {
                lead.location.map(|lead_location| {
                    backup_waypoint(
                        lead_location,
                        lead.heading.unwrap_or(0.0),
                        ctx.config.swarm.formation_radius_m,
                        ctx.config.flight.altitude,
                    )
                })
            })
        };
        if let Some(station) = station {
            ctx.vehicle.goto(station, ctx.config.flight.speed).await?;
        }
    }
}

/// SCOUT: sweep the search perimeter above the formation and report fresh
/// readings at the pursued frequency back to the lead.
async fn scout_loop(
    ctx: &AgentContext,
    frequency: FrequencyHz,
    cancel: &CancellationToken,
) -> SwarmResult<()> {
    let mut interval = tokio::time::interval(CYCLE);
    let altitude = ctx.config.flight.altitude + ctx.config.swarm.scout_altitude_offset_m;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = interval.tick() => {}
        }

        let location = ctx.vehicle.current_location().await?;
        if range_guard(ctx, location).await? {
            return Ok(());
        }
        if avoidance_guard(ctx, Role::Scout, location).await? {
            continue;
        }

        let now = Timestamp::now();
        let (target, reading, lead_rssi, drone_id) = {
            let state = ctx.state.read().await;
            let reading = state
                .signals
                .get(&frequency)
                .filter(|r| !r.timestamp.is_stale(now, 2.0))
                .map(|r| r.rssi);
            let lead_rssi = state
                .lead_peer()
                .and_then(|(_, p)| p.reported_rssi.get(&frequency).copied());
            (state.target_location, reading, lead_rssi, state.drone_id.clone())
        };

        // Report only readings the lead would want: stronger than what it
        // last reported itself (or anything, when we don't know its reading).
        if let Some(rssi) = reading {
            if lead_rssi.is_none_or(|lead| rssi > lead) {
                ctx.bus.publish(&SwarmMessage::ScoutSignal {
                    drone_id,
                    frequency,
                    rssi,
                    location: Location::from(location),
                })?;
            }
        }

        if let Some(target) = target {
            let waypoint =
                scout_waypoint(target, ctx.config.swarm.search_radius_m, altitude, now);
            ctx.vehicle.goto(waypoint, ctx.config.flight.speed).await?;
        }
    }
}
