//! Unit tests for rfs-proto.

use std::collections::BTreeMap;

use rfs_core::{DroneId, FrequencyHz, Role, Timestamp};

use crate::message::{
    Capabilities, Location, RoleAssignment, SwarmMessage, Velocity, decode, encode,
};

fn roundtrip(message: SwarmMessage) -> SwarmMessage {
    decode(&encode(&message).unwrap()).unwrap()
}

#[cfg(test)]
mod codec {
    use super::*;

    #[test]
    fn every_kind_roundtrips() {
        let loc = Location { latitude: 37.77, longitude: -122.42, altitude: 80.0 };
        let messages = vec![
            SwarmMessage::DroneRegistration {
                drone_id: DroneId::from("drone1"),
                capabilities: Capabilities {
                    sdr_enabled:   true,
                    tdoa_capable:  true,
                    max_altitude:  120.0,
                    max_speed:     10.0,
                    battery_level: 100.0,
                },
            },
            SwarmMessage::DroneStatus {
                drone_id:         DroneId::from("drone1"),
                location:         loc,
                battery:          87.5,
                role:             Role::Triangulation,
                is_lead:          false,
                target_frequency: Some(FrequencyHz::from_mhz(433.92)),
                timestamp:        Timestamp(1_000.5),
            },
            SwarmMessage::DronePosition {
                drone_id:  DroneId::from("drone2"),
                location:  loc,
                velocity:  Velocity { x: 1.0, y: -2.0, z: 0.5 },
                heading:   271.0,
                timestamp: Timestamp(1_001.0),
            },
            SwarmMessage::ViolationDetected {
                drone_id:           DroneId::from("drone3"),
                frequency:          FrequencyHz::from_mhz(100.1),
                rssi:               -42.0,
                tdoa:               Some(3.2e-6),
                predicted_location: Some(loc),
                timestamp:          Timestamp(1_002.0),
            },
            SwarmMessage::SwarmRoles {
                leader_id:   DroneId::from("drone1"),
                frequency:   FrequencyHz::from_mhz(100.1),
                assignments: vec![
                    RoleAssignment { drone_id: DroneId::from("drone2"), role: Role::Triangulation },
                    RoleAssignment { drone_id: DroneId::from("drone3"), role: Role::Backup },
                ],
            },
            SwarmMessage::FrequencyBandAssignment {
                assignments: BTreeMap::from([(
                    DroneId::from("drone1"),
                    (FrequencyHz(88_000_000), FrequencyHz(108_000_000)),
                )]),
            },
            SwarmMessage::DroneReturning { drone_id: DroneId::from("drone2") },
            SwarmMessage::ScoutSignal {
                drone_id:  DroneId::from("drone4"),
                frequency: FrequencyHz::from_mhz(100.1),
                rssi:      -38.0,
                location:  loc,
            },
        ];

        for message in messages {
            assert_eq!(roundtrip(message.clone()), message);
        }
    }

    #[test]
    fn wire_tag_is_snake_case() {
        let raw = encode(&SwarmMessage::DroneReturning { drone_id: DroneId::from("d") }).unwrap();
        assert!(raw.contains("\"type\":\"drone_returning\""), "{raw}");
    }

    #[test]
    fn decodes_hand_written_status() {
        let raw = r#"{
            "type": "drone_status",
            "drone_id": "drone9",
            "location": {"latitude": 1.0, "longitude": 2.0, "altitude": 30.0},
            "battery": 55.0,
            "role": "SCOUT",
            "is_lead": false,
            "target_frequency": null,
            "timestamp": 123.0
        }"#;
        let message = decode(raw).unwrap();
        match message {
            SwarmMessage::DroneStatus { drone_id, role, target_frequency, .. } => {
                assert_eq!(drone_id, DroneId::from("drone9"));
                assert_eq!(role, Role::Scout);
                assert_eq!(target_frequency, None);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(decode(r#"{"type": "warp_drive_engaged"}"#).is_err());
        assert!(decode("not json at all").is_err());
    }

    #[test]
    fn sender_attribution() {
        let m = SwarmMessage::DroneReturning { drone_id: DroneId::from("drone2") };
        assert_eq!(m.sender(), Some(&DroneId::from("drone2")));

        let band = SwarmMessage::FrequencyBandAssignment { assignments: BTreeMap::new() };
        assert_eq!(band.sender(), None);
    }
}
