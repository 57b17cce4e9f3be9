//! The swarm agent runtime.
//!
//! One [`SwarmAgent`] per drone.  It owns the authoritative [`SwarmState`]
//! behind a single `RwLock`; the receive loop is the only writer of peer
//! state, behavior loops read snapshots.  All coordination rides the
//! broadcast [`Bus`], so a process can host one agent against real hardware
//! or a whole simulated swarm on the same channel.
//!
//! Loop schedule:
//!
//! | loop      | period                    | writes                        |
//! |-----------|---------------------------|-------------------------------|
//! | status    | 1 s                       | bus only                      |
//! | position  | `position_share_interval` | bus only                      |
//! | scan      | 1 s                       | signals, violations           |
//! | receive   | event-driven              | peers, signals, roles, bands  |
//! | cleanup   | 5 s                       | evictions, re-elections       |

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rfs_core::{DroneId, FrequencyHz, GeoPoint, ReceiverId, Role, SignalMeasurement, Timestamp};
use rfs_geoloc::{GeoEngine, GeolocationResult, Receiver, ReceiverRegistry};
use rfs_proto::{Capabilities, Location, SwarmMessage, decode, encode};

use crate::SwarmResult;
use crate::bands::{assign_bands, band_contains};
use crate::config::AgentConfig;
use crate::election::elect;
use crate::error::SwarmError;
use crate::roles::run_role;
use crate::state::{SignalReading, SwarmState};
use crate::traits::{MovementPredictor, SignalSource, Vehicle};

/// RSSI a scan must exceed to count as a violation, dBm.
pub const VIOLATION_THRESHOLD_DBM: f64 = -70.0;
/// How much stronger a scout's reading must be before the lead re-centers, dB.
pub const SCOUT_RECENTER_MARGIN_DB: f64 = 3.0;
/// Stale-peer sweep period, seconds.
const CLEANUP_INTERVAL_SECS: f64 = 5.0;
/// Broadcast channel depth; laggy receivers drop the oldest messages.
const BUS_CAPACITY: usize = 256;

/// The shared coordination channel.  Messages travel wire-encoded so every
/// subscriber exercises the same decode path as a networked deployment.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<String>,
}

impl Bus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Encode and broadcast.  A send with no live subscribers is not an
    /// error; the message is simply unheard.
    pub fn publish(&self, message: &SwarmMessage) -> SwarmResult<()> {
        let raw = encode(message)?;
        if self.tx.send(raw).is_err() {
            debug!("bus publish with no subscribers");
        }
        Ok(())
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the behavior loops share.
pub struct AgentContext {
    pub config:    AgentConfig,
    pub state:     Arc<RwLock<SwarmState>>,
    pub vehicle:   Arc<dyn Vehicle>,
    pub signal:    Arc<dyn SignalSource>,
    pub predictor: Arc<dyn MovementPredictor>,
    pub bus:       Bus,
}

impl AgentContext {
    /// Convert a dBm reading to the linear power the solver's inverse-square
    /// model expects.
    pub fn dbm_to_power(rssi_dbm: f64) -> f64 {
        10f64.powf(rssi_dbm / 10.0)
    }

    /// Build a registry snapshot treating self and every fresh peer as a
    /// mobile receiver, reference at self.  The snapshot is cheap and owned,
    /// so solves can run on the blocking pool without holding the state lock.
    pub async fn registry_snapshot(&self, self_location: GeoPoint) -> ReceiverRegistry {
        let mut registry = ReceiverRegistry::new();
        let self_rx = ReceiverId::from(self.config.drone_id.as_str());
        registry.add(Receiver::new(
            self.config.drone_id.as_str(),
            self_location.lat,
            self_location.lon,
            self_location.alt,
        ));
        registry.set_reference(&self_rx);

        let state = self.state.read().await;
        let now = Timestamp::now();
        for (id, peer) in state.fresh_peers(now) {
            if let Some(location) = peer.location {
                registry.add(Receiver::new(
                    id.as_str(),
                    location.lat,
                    location.lon,
                    location.alt,
                ));
            }
        }
        registry
    }

    /// Run the hybrid solve on the blocking pool against a registry snapshot
    /// and the current measurement window.
    pub async fn resolve_target(
        &self,
        frequency: FrequencyHz,
        self_location: GeoPoint,
    ) -> SwarmResult<Option<GeolocationResult>> {
        let registry = self.registry_snapshot(self_location).await;
        let window = {
            let state = self.state.read().await;
            state.measurement_window(frequency, Timestamp::now())
        };
        if window.len() < 3 {
            return Ok(None);
        }

        let result = tokio::task::spawn_blocking(move || {
            let engine = GeoEngine::new(registry);
            let measurements = engine.calculate_tdoa(window);
            engine.geolocate_hybrid(frequency, &measurements)
        })
        .await
        .map_err(|e| SwarmError::Task(e.to_string()))?;

        if let Some(fix) = &result {
            let mut state = self.state.write().await;
            state.target_location = Some(fix.position());
            info!(%frequency, lat = fix.latitude, lon = fix.longitude,
                  method = ?fix.method, "updated target estimate");
        }
        Ok(result)
    }

    /// Recompute the band partition from current membership.  Deterministic,
    /// so every agent lands on the same partition without a broadcast; the
    /// lead still publishes it so late joiners converge immediately.
    pub async fn reassign_bands(&self) -> SwarmResult<()> {
        let (assignments, is_lead) = {
            let mut state = self.state.write().await;
            let mut ids: Vec<DroneId> = state.peers.keys().cloned().collect();
            ids.push(state.drone_id.clone());
            let assignments = assign_bands(ids);
            state.band_assignments = assignments.clone();
            (assignments, state.is_lead)
        };
        if is_lead {
            self.bus.publish(&SwarmMessage::FrequencyBandAssignment { assignments })?;
        }
        Ok(())
    }

    /// Run an election at `frequency` from the local candidate snapshot and
    /// adopt the outcome.  Every agent computes the same ranking, so only the
    /// winner broadcasts; concurrent elections reconcile last-writer-wins.
    pub async fn trigger_election(&self, frequency: FrequencyHz) -> SwarmResult<Option<Role>> {
        let battery = self.vehicle.battery_level().await.unwrap_or(0.0);
        let (candidates, self_id) = {
            let state = self.state.read().await;
            (state.candidates(frequency, battery), state.drone_id.clone())
        };
        let Some(outcome) = elect(candidates) else {
            return Ok(None);
        };

        let role = outcome.role_of(&self_id).unwrap_or(Role::Scout);
        info!(%frequency, leader = %outcome.leader, ?role, "election complete");

        {
            let mut state = self.state.write().await;
            state.begin_pursuit(role, frequency);
            state.leader_id = Some(outcome.leader.clone());
        }

        if outcome.leader == self_id {
            self.bus.publish(&SwarmMessage::SwarmRoles {
                leader_id:   outcome.leader,
                frequency,
                assignments: outcome.assignments,
            })?;
        }
        Ok(Some(role))
    }

    /// Announce departure, clear pursuit state, and fly home.
    pub async fn return_to_home(&self) -> SwarmResult<()> {
        let drone_id = {
            let mut state = self.state.write().await;
            state.clear_pursuit();
            state.drone_id.clone()
        };
        warn!(%drone_id, "returning to home location");
        self.bus.publish(&SwarmMessage::DroneReturning { drone_id })?;
        self.vehicle
            .goto(self.config.flight.home_location, self.config.flight.speed)
            .await?;
        self.vehicle.land().await
    }
}

/// Handle over a running agent: loop tasks plus the shutdown token.
pub struct AgentHandle {
    pub shutdown: CancellationToken,
    tasks:        Vec<JoinHandle<()>>,
}

impl AgentHandle {
    /// Cancel every loop and wait for them to drain.
    pub async fn stop(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

pub struct SwarmAgent {
    ctx:        Arc<AgentContext>,
    /// Token of the currently running role loop, if any.
    role_token: Arc<Mutex<Option<CancellationToken>>>,
}

impl SwarmAgent {
    pub fn new(
        config: AgentConfig,
        vehicle: Arc<dyn Vehicle>,
        signal: Arc<dyn SignalSource>,
        predictor: Arc<dyn MovementPredictor>,
        bus: Bus,
    ) -> Self {
        let state = Arc::new(RwLock::new(SwarmState::new(config.drone_id.clone())));
        let ctx = Arc::new(AgentContext { config, state, vehicle, signal, predictor, bus });
        Self { ctx, role_token: Arc::new(Mutex::new(None)) }
    }

    pub fn context(&self) -> Arc<AgentContext> {
        Arc::clone(&self.ctx)
    }

    pub fn state(&self) -> Arc<RwLock<SwarmState>> {
        Arc::clone(&self.ctx.state)
    }

    /// Register with the swarm, take off, and start every loop.
    pub async fn start(&self) -> SwarmResult<AgentHandle> {
        let ctx = &self.ctx;
        let battery = ctx.vehicle.battery_level().await?;
        ctx.bus.publish(&SwarmMessage::DroneRegistration {
            drone_id:     ctx.config.drone_id.clone(),
            capabilities: Capabilities {
                sdr_enabled:   true,
                tdoa_capable:  true,
                max_altitude:  crate::config::MAX_ALTITUDE_M,
                max_speed:     ctx.config.flight.speed,
                battery_level: battery,
            },
        })?;
        ctx.reassign_bands().await?;

        ctx.vehicle.arm().await?;
        ctx.vehicle.takeoff(ctx.config.flight.altitude).await?;
        info!(drone = %ctx.config.drone_id, "agent airborne");

        let shutdown = CancellationToken::new();
        let tasks = vec![
            self.spawn_receive_loop(shutdown.clone()),
            self.spawn_status_loop(shutdown.clone()),
            self.spawn_position_loop(shutdown.clone()),
            self.spawn_scan_loop(shutdown.clone()),
            self.spawn_cleanup_loop(shutdown.clone()),
        ];
        Ok(AgentHandle { shutdown, tasks })
    }

    /// Switch role loops: cancel the running one, start the new one as a
    /// child of `shutdown` so agent shutdown also stops it.
    pub async fn set_role(
        &self,
        role: Role,
        frequency: FrequencyHz,
        shutdown: &CancellationToken,
    ) {
        let mut guard = self.role_token.lock().await;
        if let Some(previous) = guard.take() {
            previous.cancel();
        }
        if !role.is_assigned() {
            return;
        }
        let token = shutdown.child_token();
        *guard = Some(token.clone());
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            run_role(ctx, role, frequency, token).await;
        });
    }

    // ── Loops ─────────────────────────────────────────────────────────────

    fn spawn_status_loop(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = broadcast_status(&ctx).await {
                            warn!(error = %e, "status broadcast failed");
                        }
                    }
                }
            }
        })
    }

    fn spawn_position_loop(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let period = std::time::Duration::from_secs_f64(ctx.config.swarm.position_share_interval);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = broadcast_position(&ctx).await {
                            warn!(error = %e, "position broadcast failed");
                        }
                    }
                }
            }
        })
    }

    fn spawn_scan_loop(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let agent = self.clone_for_loop();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = scan_step(&ctx, &agent, &shutdown).await {
                            warn!(error = %e, "scan step failed");
                        }
                    }
                }
            }
        })
    }

    fn spawn_receive_loop(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let agent = self.clone_for_loop();
        let mut rx = ctx.bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(raw) => {
                            if let Err(e) = handle_message(&ctx, &agent, &shutdown, &raw).await {
                                warn!(error = %e, "message handling failed");
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(missed = n, "receive loop lagged, messages dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        })
    }

    fn spawn_cleanup_loop(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let agent = self.clone_for_loop();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs_f64(CLEANUP_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = cleanup_step(&ctx, &agent, &shutdown).await {
                            warn!(error = %e, "cleanup step failed");
                        }
                    }
                }
            }
        })
    }

    /// Cheap clone sharing context and role-token slot, for moving into loop
    /// tasks that need `set_role`.
    fn clone_for_loop(&self) -> SwarmAgent {
        SwarmAgent {
            ctx:        Arc::clone(&self.ctx),
            role_token: Arc::clone(&self.role_token),
        }
    }
}

// ── Loop bodies ───────────────────────────────────────────────────────────

async fn broadcast_status(ctx: &AgentContext) -> SwarmResult<()> {
    let location = ctx.vehicle.current_location().await?;
    let battery = ctx.vehicle.battery_level().await?;
    let (role, is_lead, target_frequency, drone_id) = {
        let state = ctx.state.read().await;
        (state.role, state.is_lead, state.target_frequency, state.drone_id.clone())
    };
    ctx.bus.publish(&SwarmMessage::DroneStatus {
        drone_id,
        location: Location::from(location),
        battery,
        role,
        is_lead,
        target_frequency,
        timestamp: Timestamp::now(),
    })
}

async fn broadcast_position(ctx: &AgentContext) -> SwarmResult<()> {
    let location = ctx.vehicle.current_location().await?;
    let velocity = ctx.vehicle.velocity().await?;
    let heading = ctx.vehicle.heading().await?;
    let drone_id = ctx.state.read().await.drone_id.clone();
    ctx.bus.publish(&SwarmMessage::DronePosition {
        drone_id,
        location: Location::from(location),
        velocity,
        heading,
        timestamp: Timestamp::now(),
    })
}

/// Poll the SDR, record the measurement, and raise a violation when a strong
/// signal inside our assigned band has no active pursuit yet.
async fn scan_step(
    ctx: &AgentContext,
    agent: &SwarmAgent,
    shutdown: &CancellationToken,
) -> SwarmResult<()> {
    let Some(measurement) = ctx.signal.latest_measurement().await? else {
        return Ok(());
    };
    let rssi = 10.0 * measurement.power.max(1e-12).log10();
    let frequency = measurement.frequency;

    let (drone_id, in_band, already_pursuing) = {
        let mut state = ctx.state.write().await;
        state.record_measurement(measurement.clone());
        state.record_signal(frequency, SignalReading {
            rssi,
            tdoa: measurement.tdoa,
            predicted_location: None,
            timestamp: measurement.timestamp,
        });
        let in_band = state
            .band_assignments
            .get(&state.drone_id)
            .is_none_or(|band| band_contains(*band, frequency));
        (state.drone_id.clone(), in_band, state.pursuing)
    };

    if rssi < VIOLATION_THRESHOLD_DBM || !in_band {
        return Ok(());
    }

    debug!(%frequency, rssi, "violation detected in assigned band");
    ctx.bus.publish(&SwarmMessage::ViolationDetected {
        drone_id,
        frequency,
        rssi,
        tdoa: measurement.tdoa,
        predicted_location: None,
        timestamp: measurement.timestamp,
    })?;

    if !already_pursuing {
        if let Some(role) = ctx.trigger_election(frequency).await? {
            agent.set_role(role, frequency, shutdown).await;
        }
    }
    Ok(())
}

/// Apply one inbound message to local state.
async fn handle_message(
    ctx: &AgentContext,
    agent: &SwarmAgent,
    shutdown: &CancellationToken,
    raw: &str,
) -> SwarmResult<()> {
    let message = match decode(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "dropping undecodable message");
            return Ok(());
        }
    };
    let self_id = ctx.state.read().await.drone_id.clone();
    if message.sender() == Some(&self_id) {
        return Ok(());
    }

    match message {
        SwarmMessage::DroneRegistration { drone_id, .. } => {
            info!(peer = %drone_id, "peer registered");
            ctx.state
                .write()
                .await
                .register_peer(&drone_id, Timestamp::now());
            ctx.reassign_bands().await?;
        }

        SwarmMessage::DroneStatus {
            drone_id, location, battery, role, is_lead, target_frequency, timestamp,
        } => {
            let newcomer = {
                let mut state = ctx.state.write().await;
                let newcomer = !state.peers.contains_key(&drone_id);
                state.apply_status(
                    &drone_id,
                    GeoPoint::from(location),
                    battery,
                    role,
                    is_lead,
                    target_frequency,
                    timestamp,
                );
                newcomer
            };
            // A status from an unknown drone means we missed its
            // registration; membership changed either way.
            if newcomer {
                ctx.reassign_bands().await?;
            }
        }

        SwarmMessage::DronePosition { drone_id, location, velocity, heading, timestamp } => {
            let newcomer = {
                let mut state = ctx.state.write().await;
                let newcomer = !state.peers.contains_key(&drone_id);
                state.apply_position(
                    &drone_id,
                    GeoPoint::from(location),
                    velocity,
                    heading,
                    timestamp,
                );
                newcomer
            };
            if newcomer {
                ctx.reassign_bands().await?;
            }
        }

        SwarmMessage::ViolationDetected {
            drone_id, frequency, rssi, tdoa, predicted_location, timestamp,
        } => {
            let already_pursuing = {
                let mut state = ctx.state.write().await;
                state.note_peer_rssi(&drone_id, frequency, rssi);
                state.record_signal(frequency, SignalReading {
                    rssi,
                    tdoa,
                    predicted_location: predicted_location.map(GeoPoint::from),
                    timestamp,
                });
                // The reporter contributes a measurement to the window; only
                // useful when we know where the reporter is.
                let reporter_located = state
                    .peers
                    .get(&drone_id)
                    .is_some_and(|p| p.location.is_some());
                if reporter_located {
                    let mut m = SignalMeasurement::new(
                        ReceiverId::from(drone_id.as_str()),
                        frequency,
                        AgentContext::dbm_to_power(rssi),
                        timestamp,
                    );
                    m.tdoa = tdoa;
                    state.record_measurement(m);
                }
                state.pursuing
            };

            if !already_pursuing {
                if let Some(role) = ctx.trigger_election(frequency).await? {
                    agent.set_role(role, frequency, shutdown).await;
                }
            }
        }

        SwarmMessage::SwarmRoles { leader_id, frequency, assignments } => {
            let role = assignments
                .iter()
                .find(|a| a.drone_id == self_id)
                .map(|a| a.role);
            {
                let mut state = ctx.state.write().await;
                state.leader_id = Some(leader_id);
                if let Some(role) = role {
                    state.begin_pursuit(role, frequency);
                }
            }
            if let Some(role) = role {
                agent.set_role(role, frequency, shutdown).await;
            }
        }

        SwarmMessage::FrequencyBandAssignment { assignments } => {
            ctx.state.write().await.band_assignments = assignments;
        }

        SwarmMessage::DroneReturning { drone_id } => {
            let lead_lost = {
                let mut state = ctx.state.write().await;
                let was_lead = state
                    .peers
                    .remove(&drone_id)
                    .map(|p| p.is_lead)
                    .unwrap_or(false)
                    || state.leader_id.as_ref() == Some(&drone_id);
                was_lead && state.pursuing
            };
            ctx.reassign_bands().await?;
            if lead_lost {
                reelect(ctx, agent, shutdown).await?;
            }
        }

        SwarmMessage::ScoutSignal { drone_id, frequency, rssi, location } => {
            let recenter = {
                let mut state = ctx.state.write().await;
                state.note_peer_rssi(&drone_id, frequency, rssi);
                let own_rssi = state
                    .signals
                    .get(&frequency)
                    .map(|r| r.rssi)
                    .unwrap_or(f64::NEG_INFINITY);
                state.is_lead
                    && state.target_frequency == Some(frequency)
                    && rssi > own_rssi + SCOUT_RECENTER_MARGIN_DB
            };
            if recenter {
                info!(scout = %drone_id, rssi, "scout reading stronger, re-centering search");
                let mut state = ctx.state.write().await;
                state.target_location = Some(GeoPoint::from(location));
            }
        }
    }
    Ok(())
}

/// Evict stale peers, prune the measurement window, and re-elect when the
/// lead went silent.
async fn cleanup_step(
    ctx: &AgentContext,
    agent: &SwarmAgent,
    shutdown: &CancellationToken,
) -> SwarmResult<()> {
    let now = Timestamp::now();
    let sweep = {
        let mut state = ctx.state.write().await;
        state.prune_window(now);
        state.evict_stale(now)
    };
    if !sweep.removed.is_empty() {
        info!(removed = sweep.removed.len(), "evicted stale peers");
        ctx.reassign_bands().await?;
    }
    if sweep.lead_lost {
        warn!("lead went silent, re-electing");
        reelect(ctx, agent, shutdown).await?;
    }
    Ok(())
}

async fn reelect(
    ctx: &AgentContext,
    agent: &SwarmAgent,
    shutdown: &CancellationToken,
) -> SwarmResult<()> {
    let frequency = ctx.state.read().await.target_frequency;
    if let Some(frequency) = frequency {
        if let Some(role) = ctx.trigger_election(frequency).await? {
            agent.set_role(role, frequency, shutdown).await;
        }
    }
    Ok(())
}
