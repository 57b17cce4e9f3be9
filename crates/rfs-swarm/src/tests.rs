//! Unit and runtime tests for the swarm coordination layer.

#[cfg(test)]
mod election {
    use rfs_core::{DroneId, Role};

    use crate::election::{Candidate, elect, rank};

    fn candidate(id: &str, rssi: f64, battery: f64) -> Candidate {
        Candidate { drone_id: DroneId::from(id), rssi, battery }
    }

    #[test]
    fn strongest_signal_leads() {
        let outcome = elect(vec![
            candidate("droneB", -60.0, 100.0),
            candidate("droneA", -40.0, 90.0),
        ])
        .unwrap();

        assert_eq!(outcome.leader, DroneId::from("droneA"));
        assert_eq!(outcome.role_of(&DroneId::from("droneA")), Some(Role::Lead));
        assert_eq!(
            outcome.role_of(&DroneId::from("droneB")),
            Some(Role::Triangulation)
        );
    }

    #[test]
    fn battery_breaks_rssi_tie() {
        let outcome = elect(vec![
            candidate("droneA", -50.0, 60.0),
            candidate("droneB", -50.0, 95.0),
        ])
        .unwrap();
        assert_eq!(outcome.leader, DroneId::from("droneB"));
    }

    #[test]
    fn id_breaks_full_tie_deterministically() {
        let outcome = elect(vec![
            candidate("droneZ", -50.0, 80.0),
            candidate("droneA", -50.0, 80.0),
        ])
        .unwrap();
        assert_eq!(outcome.leader, DroneId::from("droneA"));
    }

    #[test]
    fn ranking_independent_of_input_order() {
        let a = vec![
            candidate("d1", -45.0, 70.0),
            candidate("d2", -55.0, 90.0),
            candidate("d3", -45.0, 80.0),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(rank(a), rank(b));
    }

    #[test]
    fn extra_candidates_clamp_to_scout() {
        let outcome = elect(vec![
            candidate("d1", -40.0, 90.0),
            candidate("d2", -50.0, 90.0),
            candidate("d3", -60.0, 90.0),
            candidate("d4", -70.0, 90.0),
            candidate("d5", -80.0, 90.0),
            candidate("d6", -90.0, 90.0),
        ])
        .unwrap();

        assert_eq!(outcome.role_of(&DroneId::from("d4")), Some(Role::Scout));
        assert_eq!(outcome.role_of(&DroneId::from("d5")), Some(Role::Scout));
        assert_eq!(outcome.role_of(&DroneId::from("d6")), Some(Role::Scout));
    }

    #[test]
    fn lone_candidate_self_elects() {
        let outcome = elect(vec![candidate("solo", -90.0, 20.0)]).unwrap();
        assert_eq!(outcome.leader, DroneId::from("solo"));
        assert_eq!(outcome.role_of(&DroneId::from("solo")), Some(Role::Lead));
    }

    #[test]
    fn empty_candidate_set_elects_nobody() {
        assert!(elect(Vec::new()).is_none());
    }
}

#[cfg(test)]
mod bands {
    use rfs_core::{DroneId, FrequencyHz};

    use crate::bands::{FREQUENCY_BANDS, assign_bands, band_contains};

    fn ids(names: &[&str]) -> Vec<DroneId> {
        names.iter().map(|n| DroneId::from(*n)).collect()
    }

    #[test]
    fn bands_disjoint_up_to_band_count() {
        let assignments = assign_bands(ids(&["d1", "d2", "d3", "d4"]));
        let mut bands: Vec<_> = assignments.values().collect();
        bands.sort();
        bands.dedup();
        assert_eq!(bands.len(), 4);
    }

    #[test]
    fn assignment_independent_of_input_order() {
        let a = assign_bands(ids(&["d3", "d1", "d2"]));
        let b = assign_bands(ids(&["d2", "d3", "d1", "d1"]));
        assert_eq!(a, b);
    }

    #[test]
    fn wraps_past_four_drones() {
        let assignments = assign_bands(ids(&["d1", "d2", "d3", "d4", "d5"]));
        assert_eq!(assignments[&DroneId::from("d5")], FREQUENCY_BANDS[0]);
    }

    #[test]
    fn band_edges_inclusive() {
        let fm = FREQUENCY_BANDS[0];
        assert!(band_contains(fm, FrequencyHz(88_000_000)));
        assert!(band_contains(fm, FrequencyHz(108_000_000)));
        assert!(!band_contains(fm, FrequencyHz(108_000_001)));
        assert!(band_contains(fm, FrequencyHz::from_mhz(100.0)));
    }
}

#[cfg(test)]
mod avoidance {
    use rfs_core::{DroneId, GeoPoint, Role, Timestamp};
    use rfs_proto::Velocity;

    use crate::avoidance::{AvoidanceManeuver, CollisionRisk, detect_risks, plan_avoidance};
    use crate::config::{MAX_ALTITUDE_M, MIN_ALTITUDE_M, SwarmParams};
    use crate::state::SwarmState;

    const BASE: GeoPoint = GeoPoint { lat: 37.7749, lon: -122.4194, alt: 100.0 };

    fn risk(role: Role, peer_location: GeoPoint, horizontal_m: f64) -> CollisionRisk {
        CollisionRisk {
            peer_id: DroneId::from("peer"),
            peer_role: role,
            peer_location,
            horizontal_m,
            vertical_m: (BASE.alt - peer_location.alt).abs(),
        }
    }

    #[test]
    fn detects_pair_inside_both_margins() {
        let mut state = SwarmState::new(DroneId::from("self"));
        let now = Timestamp(1_000.0);
        // ~10 m east, 2 m below.
        let peer_location = BASE.destination(10.0, std::f64::consts::FRAC_PI_2);
        let peer_location = GeoPoint { alt: 98.0, ..peer_location };
        state.apply_position(
            &DroneId::from("peer"),
            peer_location,
            Velocity::default(),
            90.0,
            now,
        );

        let risks = detect_risks(&state, BASE, &SwarmParams::default(), now);
        assert_eq!(risks.len(), 1);
        assert!((risks[0].horizontal_m - 10.0).abs() < 0.5);
    }

    #[test]
    fn vertical_margin_makes_pair_safe() {
        let mut state = SwarmState::new(DroneId::from("self"));
        let now = Timestamp(1_000.0);
        // Directly alongside but 30 m below: stacked safely.
        let peer_location = GeoPoint { alt: 70.0, ..BASE.destination(5.0, 0.0) };
        state.apply_position(
            &DroneId::from("peer"),
            peer_location,
            Velocity::default(),
            0.0,
            now,
        );

        assert!(detect_risks(&state, BASE, &SwarmParams::default(), now).is_empty());
    }

    const MIN_SEP_M: f64 = 15.0;

    #[test]
    fn equal_priority_yields_laterally_when_altitude_gap_small() {
        let peer = GeoPoint { alt: 98.0, ..BASE.destination(10.0, 0.0) };
        let maneuver =
            plan_avoidance(Role::Backup, BASE, &risk(Role::Backup, peer, 10.0), MIN_SEP_M);

        match maneuver {
            Some(AvoidanceManeuver::Lateral(target)) => {
                // Displaced away from the peer (peer is north, we go south)
                // by the minimum separation.
                assert!(target.lat < BASE.lat);
                assert!((BASE.surface_distance_m(target) - MIN_SEP_M).abs() < 0.5);
            }
            other => panic!("expected lateral maneuver, got {other:?}"),
        }
    }

    #[test]
    fn higher_priority_does_not_yield() {
        let peer = GeoPoint { alt: 98.0, ..BASE.destination(10.0, 0.0) };
        assert!(
            plan_avoidance(Role::Lead, BASE, &risk(Role::Scout, peer, 10.0), MIN_SEP_M).is_none()
        );
    }

    #[test]
    fn wide_altitude_gap_widens_vertically() {
        // Peer 9 m above: altitude branch, we descend by the standard step.
        let peer = GeoPoint { alt: 109.0, ..BASE.destination(10.0, 0.0) };
        let maneuver = plan_avoidance(Role::Scout, BASE, &risk(Role::Lead, peer, 10.0), MIN_SEP_M);
        assert_eq!(maneuver, Some(AvoidanceManeuver::Altitude(90.0)));
    }

    #[test]
    fn altitude_maneuver_clamps_to_envelope() {
        let low = GeoPoint { alt: MIN_ALTITUDE_M + 2.0, ..BASE };
        let peer = GeoPoint { alt: low.alt + 9.0, ..BASE.destination(10.0, 0.0) };
        let maneuver = plan_avoidance(Role::Scout, low, &risk(Role::Lead, peer, 10.0), MIN_SEP_M);
        assert_eq!(maneuver, Some(AvoidanceManeuver::Altitude(MIN_ALTITUDE_M)));

        let high = GeoPoint { alt: MAX_ALTITUDE_M - 2.0, ..BASE };
        let peer = GeoPoint { alt: high.alt - 9.0, ..BASE.destination(10.0, 0.0) };
        let maneuver = plan_avoidance(Role::Scout, high, &risk(Role::Lead, peer, 10.0), MIN_SEP_M);
        assert_eq!(maneuver, Some(AvoidanceManeuver::Altitude(MAX_ALTITUDE_M)));
    }
}

#[cfg(test)]
mod state {
    use rfs_core::{DroneId, FrequencyHz, GeoPoint, Role, Timestamp};

    use crate::election::NO_SIGNAL_RSSI;
    use crate::state::{SignalReading, SwarmState};

    const FREQ: FrequencyHz = FrequencyHz(100_000_000);
    const P1: GeoPoint = GeoPoint { lat: 37.0, lon: -122.0, alt: 100.0 };
    const P2: GeoPoint = GeoPoint { lat: 38.0, lon: -121.0, alt: 110.0 };

    fn apply_status_at(state: &mut SwarmState, id: &str, location: GeoPoint, t: f64) {
        state.apply_status(
            &DroneId::from(id),
            location,
            80.0,
            Role::Scout,
            false,
            None,
            Timestamp(t),
        );
    }

    #[test]
    fn out_of_order_status_is_dropped() {
        let mut state = SwarmState::new(DroneId::from("self"));
        apply_status_at(&mut state, "peer", P2, 200.0);
        apply_status_at(&mut state, "peer", P1, 100.0); // stale, ignored

        let peer = &state.peers[&DroneId::from("peer")];
        assert_eq!(peer.location, Some(P2));
    }

    #[test]
    fn duplicate_application_is_idempotent() {
        let mut a = SwarmState::new(DroneId::from("self"));
        let mut b = SwarmState::new(DroneId::from("self"));
        apply_status_at(&mut a, "peer", P1, 100.0);
        apply_status_at(&mut b, "peer", P1, 100.0);
        apply_status_at(&mut b, "peer", P1, 100.0);

        assert_eq!(
            a.peers[&DroneId::from("peer")].location,
            b.peers[&DroneId::from("peer")].location
        );
        assert_eq!(
            a.peers[&DroneId::from("peer")].last_update(),
            b.peers[&DroneId::from("peer")].last_update()
        );
    }

    #[test]
    fn own_messages_are_ignored() {
        let mut state = SwarmState::new(DroneId::from("self"));
        apply_status_at(&mut state, "self", P1, 100.0);
        assert!(state.peers.is_empty());
    }

    #[test]
    fn stale_peer_evicted() {
        let mut state = SwarmState::new(DroneId::from("self"));
        apply_status_at(&mut state, "peer", P1, 100.0);

        let sweep = state.evict_stale(Timestamp(111.0));
        assert_eq!(sweep.removed, vec![DroneId::from("peer")]);
        assert!(!sweep.lead_lost);
        assert!(state.peers.is_empty());
    }

    #[test]
    fn silent_lead_flags_reelection() {
        let mut state = SwarmState::new(DroneId::from("self"));
        state.begin_pursuit(Role::Triangulation, FREQ);
        state.leader_id = Some(DroneId::from("lead"));
        apply_status_at(&mut state, "lead", P1, 100.0);

        let sweep = state.evict_stale(Timestamp(120.0));
        assert!(sweep.lead_lost);
        assert_eq!(state.leader_id, None);
    }

    #[test]
    fn fresh_peer_survives_sweep() {
        let mut state = SwarmState::new(DroneId::from("self"));
        apply_status_at(&mut state, "peer", P1, 100.0);
        let sweep = state.evict_stale(Timestamp(105.0));
        assert!(sweep.removed.is_empty());
        assert_eq!(state.peers.len(), 1);
    }

    #[test]
    fn newer_signal_reading_wins() {
        let mut state = SwarmState::new(DroneId::from("self"));
        let newer = SignalReading {
            rssi: -40.0, tdoa: None, predicted_location: None, timestamp: Timestamp(200.0),
        };
        let older = SignalReading {
            rssi: -80.0, tdoa: None, predicted_location: None, timestamp: Timestamp(100.0),
        };
        state.record_signal(FREQ, newer.clone());
        state.record_signal(FREQ, older);
        assert_eq!(state.signals[&FREQ], newer);
    }

    #[test]
    fn candidates_default_to_no_signal_floor() {
        let mut state = SwarmState::new(DroneId::from("self"));
        apply_status_at(&mut state, "peer", P1, 100.0);

        let candidates = state.candidates(FREQ, 75.0);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].rssi, NO_SIGNAL_RSSI); // self, no reading yet
        assert_eq!(candidates[0].battery, 75.0);
        assert_eq!(candidates[1].rssi, NO_SIGNAL_RSSI);
    }

    #[test]
    fn measurement_window_excludes_stale_entries() {
        use rfs_core::{ReceiverId, SignalMeasurement};

        let mut state = SwarmState::new(DroneId::from("self"));
        state.record_measurement(SignalMeasurement::new(
            ReceiverId::from("r1"), FREQ, 0.5, Timestamp(100.0),
        ));
        state.record_measurement(SignalMeasurement::new(
            ReceiverId::from("r2"), FREQ, 0.4, Timestamp(108.0),
        ));

        let window = state.measurement_window(FREQ, Timestamp(112.0));
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].receiver_id, ReceiverId::from("r2"));
    }

    #[test]
    fn clear_pursuit_resets_role_state() {
        let mut state = SwarmState::new(DroneId::from("self"));
        state.begin_pursuit(Role::Lead, FREQ);
        assert!(state.is_lead && state.pursuing);
        state.clear_pursuit();
        assert_eq!(state.role, Role::Unassigned);
        assert!(!state.is_lead && !state.pursuing);
        assert_eq!(state.target_frequency, None);
    }
}

#[cfg(test)]
mod behavior {
    use rfs_core::{GeoPoint, Timestamp};

    use crate::behavior::{
        PredictedMove, backup_waypoint, best_probe_move, scout_waypoint, triangulation_waypoint,
    };
    use crate::config::{MAX_ALTITUDE_M, MIN_ALTITUDE_M};

    const TARGET: GeoPoint = GeoPoint { lat: 37.7749, lon: -122.4194, alt: 0.0 };

    #[test]
    fn triangulation_station_is_perpendicular_to_baseline() {
        let lead = TARGET.destination(100.0, 0.0); // lead due north of target
        let station = triangulation_waypoint(TARGET, lead, 100.0, 80.0);

        assert!((TARGET.surface_distance_m(station) - 100.0).abs() < 1.0);
        assert_eq!(station.alt, 80.0);
        // Lead→target bearing is south; +90 degrees puts the station west.
        assert!(station.lon < TARGET.lon);
        assert!((station.lat - TARGET.lat).abs() < 1e-3);
    }

    #[test]
    fn backup_station_is_behind_the_lead() {
        let lead = GeoPoint { alt: 100.0, ..TARGET.destination(100.0, 0.0) };
        // Lead heading north; behind it is due south.
        let station = backup_waypoint(lead, 0.0, 100.0, 80.0);

        assert!((lead.surface_distance_m(station) - 75.0).abs() < 1.0);
        assert!(station.lat < lead.lat);
        assert_eq!(station.alt, 80.0);
    }

    #[test]
    fn scout_sweeps_the_search_circle() {
        let a = scout_waypoint(TARGET, 200.0, 120.0, Timestamp(10.0));
        let b = scout_waypoint(TARGET, 200.0, 120.0, Timestamp(100.0));

        assert!((TARGET.surface_distance_m(a) - 200.0).abs() < 1.0);
        assert!((TARGET.surface_distance_m(b) - 200.0).abs() < 1.0);
        assert!(a.surface_distance_m(b) > 10.0); // the station advances
        assert_eq!(a.alt, 120.0);
    }

    #[test]
    fn scout_angle_wraps_every_six_minutes() {
        let a = scout_waypoint(TARGET, 200.0, 120.0, Timestamp(45.0));
        let b = scout_waypoint(TARGET, 200.0, 120.0, Timestamp(45.0 + 360.0));
        assert!(a.surface_distance_m(b) < 0.1);
    }

    #[test]
    fn vertical_moves_clamp_to_envelope() {
        let high = GeoPoint { alt: MAX_ALTITUDE_M, ..TARGET };
        assert_eq!(PredictedMove::Up.apply(high, TARGET).alt, MAX_ALTITUDE_M);

        let low = GeoPoint { alt: MIN_ALTITUDE_M, ..TARGET };
        assert_eq!(PredictedMove::Down.apply(low, TARGET).alt, MIN_ALTITUDE_M);
    }

    #[test]
    fn forward_closes_on_the_target() {
        let from = TARGET.destination(100.0, 0.0);
        let next = PredictedMove::Forward.apply(from, TARGET);
        assert!(next.surface_distance_m(TARGET) < from.surface_distance_m(TARGET));
    }

    #[test]
    fn forward_nudge_keeps_the_estimate() {
        assert_eq!(PredictedMove::Forward.nudge(TARGET), TARGET);
        let left = PredictedMove::Left.nudge(TARGET);
        assert!((left.lon - (TARGET.lon - 0.0001)).abs() < 1e-12);
    }

    #[test]
    fn probe_descends_when_directly_overhead() {
        // 5 m off horizontally, 60 m up: descending gains more than any
        // lateral step.
        let target = GeoPoint { alt: 20.0, ..TARGET };
        let from = GeoPoint { alt: 80.0, ..TARGET.destination(5.0, 0.0) };
        assert_eq!(best_probe_move(from, target), Some(PredictedMove::Down));
    }

    #[test]
    fn probe_holds_at_the_optimum() {
        // Already at the target: every candidate move increases distance.
        let target = GeoPoint { alt: 50.0, ..TARGET };
        assert_eq!(best_probe_move(target, target), None);
    }
}

#[cfg(test)]
mod config {
    use crate::config::AgentConfig;

    #[test]
    fn missing_file_provisions_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");

        let created = AgentConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, AgentConfig::default());

        // Second load reads the file written on first run.
        let loaded = AgentConfig::load_or_create(&path).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn partial_file_fills_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        std::fs::write(&path, r#"{"drone_id": "falcon7"}"#).unwrap();

        let config = AgentConfig::load_or_create(&path).unwrap();
        assert_eq!(config.drone_id.as_str(), "falcon7");
        assert_eq!(config.flight.altitude, 100.0);
        assert_eq!(config.swarm.min_separation_m, 15.0);
    }
}

#[cfg(test)]
mod runtime {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    use rfs_core::{
        DroneId, FrequencyHz, GeoPoint, ReceiverId, Role, SignalMeasurement, Timestamp,
    };
    use rfs_proto::Velocity;

    use crate::SwarmResult;
    use crate::agent::{AgentContext, Bus, SwarmAgent};
    use crate::config::AgentConfig;
    use crate::roles::run_role;
    use crate::state::SwarmState;
    use crate::traits::{GradientPredictor, SignalSource, Vehicle};

    const FREQ: FrequencyHz = FrequencyHz(100_000_000);

    struct MockVehicle {
        location: Mutex<GeoPoint>,
        commands: Mutex<Vec<GeoPoint>>,
    }

    impl MockVehicle {
        fn at(location: GeoPoint) -> Arc<Self> {
            Arc::new(Self {
                location: Mutex::new(location),
                commands: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Vehicle for MockVehicle {
        async fn arm(&self) -> SwarmResult<()> {
            Ok(())
        }
        async fn takeoff(&self, altitude_m: f64) -> SwarmResult<()> {
            self.location.lock().await.alt = altitude_m;
            Ok(())
        }
        async fn goto(&self, target: GeoPoint, _speed_mps: f64) -> SwarmResult<()> {
            self.commands.lock().await.push(target);
            *self.location.lock().await = target; // teleport
            Ok(())
        }
        async fn land(&self) -> SwarmResult<()> {
            self.location.lock().await.alt = 0.0;
            Ok(())
        }
        async fn current_location(&self) -> SwarmResult<GeoPoint> {
            Ok(*self.location.lock().await)
        }
        async fn battery_level(&self) -> SwarmResult<f64> {
            Ok(90.0)
        }
        async fn heading(&self) -> SwarmResult<f64> {
            Ok(0.0)
        }
        async fn velocity(&self) -> SwarmResult<Velocity> {
            Ok(Velocity::default())
        }
    }

    struct MockSdr {
        measurement: Mutex<Option<SignalMeasurement>>,
    }

    impl MockSdr {
        fn silent() -> Arc<Self> {
            Arc::new(Self { measurement: Mutex::new(None) })
        }

        fn hearing(receiver: &str, power: f64) -> Arc<Self> {
            Arc::new(Self {
                measurement: Mutex::new(Some(SignalMeasurement::new(
                    ReceiverId::from(receiver),
                    FREQ,
                    power,
                    Timestamp::now(),
                ))),
            })
        }
    }

    #[async_trait]
    impl SignalSource for MockSdr {
        async fn latest_measurement(&self) -> SwarmResult<Option<SignalMeasurement>> {
            Ok(self.measurement.lock().await.clone())
        }
    }

    fn config(id: &str) -> AgentConfig {
        AgentConfig {
            drone_id: DroneId::from(id),
            ..AgentConfig::default()
        }
    }

    fn agent(id: &str, sdr: Arc<MockSdr>, bus: Bus) -> SwarmAgent {
        let home = AgentConfig::default().flight.home_location;
        SwarmAgent::new(
            config(id),
            MockVehicle::at(home),
            sdr,
            Arc::new(GradientPredictor),
            bus,
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lone_agent_self_elects_on_violation() {
        let bus = Bus::new();
        // Strong in-band signal: rssi = 10*log10(0.5) ≈ -3 dBm.
        let agent = agent("solo", MockSdr::hearing("solo", 0.5), bus);

        let handle = agent.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        {
            let state = agent.state();
            let state = state.read().await;
            assert!(state.pursuing);
            assert_eq!(state.role, Role::Lead);
            assert!(state.is_lead);
            assert_eq!(state.target_frequency, Some(FREQ));
            assert_eq!(state.leader_id, Some(DroneId::from("solo")));
        }
        handle.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn two_agents_discover_each_other_and_split_bands() {
        let bus = Bus::new();
        let a = agent("droneA", MockSdr::silent(), bus.clone());
        let b = agent("droneB", MockSdr::silent(), bus.clone());

        let ha = a.start().await.unwrap();
        let hb = b.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        {
            let state = a.state();
            let state = state.read().await;
            assert!(state.peers.contains_key(&DroneId::from("droneB")));
            assert_eq!(state.band_assignments.len(), 2);
        }
        {
            let state = b.state();
            let state = state.read().await;
            assert!(state.peers.contains_key(&DroneId::from("droneA")));
            assert_eq!(state.band_assignments.len(), 2);
            // Same deterministic partition on both sides.
            let a_state = a.state();
            let a_state = a_state.read().await;
            assert_eq!(state.band_assignments, a_state.band_assignments);
        }

        ha.stop().await;
        hb.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn violation_recruits_the_whole_swarm() {
        let bus = Bus::new();
        // Only droneA hears the emitter; droneB should still join the
        // pursuit through the violation broadcast.
        let a = agent("droneA", MockSdr::hearing("droneA", 0.5), bus.clone());
        let b = agent("droneB", MockSdr::silent(), bus.clone());

        let hb = b.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let ha = a.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        {
            let state = b.state();
            let state = state.read().await;
            assert!(state.pursuing);
            assert_eq!(state.leader_id, Some(DroneId::from("droneA")));
            // B heard nothing, so it ranks below A.
            assert_ne!(state.role, Role::Lead);
        }

        ha.stop().await;
        hb.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn returning_lead_triggers_reelection_on_survivor() {
        let bus = Bus::new();
        let a = agent("droneA", MockSdr::hearing("droneA", 0.5), bus.clone());
        let b = agent("droneB", MockSdr::silent(), bus.clone());

        let hb = b.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let ha = a.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        {
            let state = b.state();
            let state = state.read().await;
            assert!(state.pursuing);
            assert_eq!(state.leader_id, Some(DroneId::from("droneA")));
        }

        // The lead heads home; stop its loops first so it cannot re-hear
        // the emitter and stand for election again.
        ha.stop().await;
        a.context().return_to_home().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        {
            let state = b.state();
            let state = state.read().await;
            assert!(!state.peers.contains_key(&DroneId::from("droneA")));
            // Sole survivor of the pursuit self-elects.
            assert!(state.pursuing);
            assert_eq!(state.role, Role::Lead);
            assert!(state.is_lead);
            assert_eq!(state.leader_id, Some(DroneId::from("droneB")));
        }
        hb.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn role_loop_stops_on_cancellation() {
        let bus = Bus::new();
        let home = AgentConfig::default().flight.home_location;
        let ctx = Arc::new(AgentContext {
            config:    config("solo"),
            state:     Arc::new(tokio::sync::RwLock::new(SwarmState::new(DroneId::from("solo")))),
            vehicle:   MockVehicle::at(home),
            signal:    MockSdr::silent(),
            predictor: Arc::new(GradientPredictor),
            bus,
        });

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_role(ctx, Role::Scout, FREQ, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("role loop did not stop after cancellation")
            .unwrap();
    }
}
