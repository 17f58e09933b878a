//! Integration tests for rack assembly and group actors
//!
//! These tests verify:
//! - Building a rack from JSON with calibration offsets and path labels
//! - Configuration errors surfacing before any driver is used
//! - Driver registry resolution
//! - Group actors serializing group operations

use atten_core::{AttenuatorInstrument, ErrorKind, Group, InstrumentInfo};
use atten_rack::{
    spawn_group_actor, ConfigError, DriverRegistry, GroupConfig, GroupStatus, InstrumentConfig,
    MemberRef, Rack, RackConfig, RackError, RackStatus, Transport,
};
use atten_sim::VirtualInstrument;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub const TWO_BOX_RACK: &str = r#"{
        "instruments": [
            {
                "model": "SIM-4",
                "transport": "simulated",
                "channel_count": 4,
                "max_attenuation": 60.0,
                "offsets": [0.0, 2.0, 0.0, 1.5],
                "paths": ["AP-2G", "AP-5G", "STA-2G", "STA-5G"]
            },
            {
                "model": "SIM-2",
                "transport": "simulated",
                "channel_count": 2,
                "max_attenuation": 31.5
            }
        ],
        "groups": [
            { "name": "ap", "members": [
                { "instrument": 0, "index": 0 },
                { "instrument": 0, "index": 1 }
            ] },
            { "name": "all-sta", "members": [
                { "instrument": 0, "index": 2 },
                { "instrument": 0, "index": 3 },
                { "instrument": 1, "index": 0 }
            ] }
        ]
    }"#;

    pub fn two_box_rack() -> Rack {
        let config = RackConfig::from_json(TWO_BOX_RACK).unwrap();
        Rack::build(&config, &DriverRegistry::with_simulated()).unwrap()
    }
}

// ============================================================================
// Rack assembly
// ============================================================================

#[test]
fn rack_applies_offsets_and_paths() {
    let rack = helpers::two_box_rack();

    assert_eq!(rack.instruments().len(), 2);
    assert_eq!(rack.attenuators().count(), 6);

    let ap_5g = rack.find_by_path("AP-5G").unwrap();
    assert_eq!(ap_5g.index(), 1);
    assert_eq!(ap_5g.offset(), 2.0);
    assert_eq!(ap_5g.model(), "SIM-4");

    let second = rack.attenuator(1, 1).unwrap();
    assert_eq!(second.offset(), 0.0);
    assert_eq!(second.path(), None);
    assert!(rack.attenuator(1, 2).is_none());
}

#[test]
fn rack_groups_command_through_offsets() {
    let mut rack = helpers::two_box_rack();

    let ap = rack.group_mut("ap").unwrap();
    ap.set_attenuation(10.0).unwrap();
    assert!(ap.is_synchronized().unwrap());

    let raw = rack.instruments()[0].instrument.get_raw(1).unwrap();
    assert_eq!(raw, 12.0);
}

#[test]
fn rack_group_stops_at_smaller_instrument() {
    let mut rack = helpers::two_box_rack();

    let sta = rack.require_group_mut("all-sta").unwrap();
    let err = sta.set_attenuation(40.0).unwrap_err();
    assert_eq!(err.member, 2);
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    assert_eq!(sta.get_attenuation(), 0.0);

    assert!(matches!(
        rack.require_group_mut("missing"),
        Err(RackError::GroupNotFound(_))
    ));
}

#[test]
fn rack_status_snapshot_round_trips() {
    let mut rack = helpers::two_box_rack();
    rack.require_group_mut("ap").unwrap().set_attenuation(6.5).unwrap();

    let status = rack.status().unwrap();
    assert_eq!(
        status.instruments[1],
        InstrumentInfo {
            model: "SIM-2".to_string(),
            channel_count: 2,
            max_attenuation: Some(31.5),
        }
    );
    assert_eq!(
        status.groups[0],
        GroupStatus {
            name: "ap".to_string(),
            members: 2,
            attenuation: 6.5,
        }
    );

    let parsed: RackStatus = serde_json::from_str(&status.to_json().unwrap()).unwrap();
    assert_eq!(parsed, status);
}

#[test]
fn read_only_group_lookup() {
    let rack = helpers::two_box_rack();
    assert_eq!(rack.require_group("all-sta").unwrap().len(), 3);
    assert!(matches!(
        rack.require_group("missing"),
        Err(RackError::GroupNotFound(ref name)) if name == "missing"
    ));
}

#[test]
fn rack_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rack.json");

    let config = RackConfig::from_json(helpers::TWO_BOX_RACK).unwrap();
    config.save(&path).unwrap();

    let loaded = RackConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        RackConfig::load(dir.path().join("absent.json")),
        Err(RackError::Io(_))
    ));
}

#[test]
fn malformed_json_is_reported() {
    assert!(matches!(
        RackConfig::from_json("{ \"instruments\": [ { \"model\": 4 } ] }"),
        Err(RackError::Json(_))
    ));
}

#[test]
fn short_offset_list_fails_before_connecting() {
    let mut inst = InstrumentConfig::simulated("SIM-4", 4, 60.0);
    inst.offsets = Some(vec![1.0; 3]);
    let config = RackConfig {
        instruments: vec![inst],
        groups: Vec::new(),
    };

    let err = Rack::build(&config, &DriverRegistry::new()).unwrap_err();
    assert!(matches!(
        err,
        RackError::Config(ConfigError::MissingOffsets { given: 3, .. })
    ));
}

#[test]
fn unknown_driver_reported() {
    let mut inst = InstrumentConfig::simulated("RCDAT-8000", 4, 60.0);
    inst.transport = Transport::Telnet;
    inst.address = "192.168.1.40".to_string();
    let config = RackConfig {
        instruments: vec![inst],
        groups: Vec::new(),
    };

    let err = Rack::build(&config, &DriverRegistry::with_simulated()).unwrap_err();
    assert!(matches!(
        err,
        RackError::UnknownDriver { ref model, transport: Transport::Telnet } if model == "RCDAT-8000"
    ));
}

#[test]
fn channel_count_mismatch_reported() {
    fn fixed_two(_: &InstrumentConfig) -> Result<Box<dyn AttenuatorInstrument>, RackError> {
        Ok(Box::new(VirtualInstrument::new("FIXED-2", 2, Some(60.0))))
    }

    let mut registry = DriverRegistry::new();
    registry.register("FIXED-2", Transport::Serial, fixed_two);

    let mut inst = InstrumentConfig::simulated("FIXED-2", 4, 60.0);
    inst.transport = Transport::Serial;
    let config = RackConfig {
        instruments: vec![inst],
        groups: Vec::new(),
    };

    assert!(matches!(
        Rack::build(&config, &registry),
        Err(RackError::ChannelCountMismatch {
            configured: 4,
            reported: 2,
            ..
        })
    ));
}

#[test]
fn bad_group_member_reported() {
    let config = RackConfig {
        instruments: vec![InstrumentConfig::simulated("SIM-2", 2, 60.0)],
        groups: vec![GroupConfig {
            name: "bad".to_string(),
            members: vec![MemberRef {
                instrument: 0,
                index: 5,
            }],
        }],
    };

    assert!(matches!(
        Rack::build(&config, &DriverRegistry::new()),
        Err(RackError::UnknownGroupMember { index: 5, .. })
    ));
}

// ============================================================================
// Group actor
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn actor_runs_group_commands() {
    let mut rack = helpers::two_box_rack();
    let group = rack.take_group("ap").unwrap();
    assert!(rack.group("ap").is_none());

    let (handle, join) = spawn_group_actor(group, 8);
    assert_eq!(handle.name(), "ap");

    handle.set(20.0).await.unwrap();
    assert_eq!(handle.get().await.unwrap(), 20.0);
    assert!(handle.is_synchronized().await.unwrap());

    // Push member 1 off target behind the actor's back
    rack.instruments()[0].instrument.set_raw(1, 5.0).unwrap();
    assert!(!handle.is_synchronized().await.unwrap());
    handle.synchronize().await.unwrap();
    assert!(handle.is_synchronized().await.unwrap());

    handle.shutdown().await;
    let group: Group = join.await.unwrap();
    assert_eq!(group.get_attenuation(), 20.0);
    assert!(handle.is_closed());
    assert!(matches!(handle.get().await, Err(RackError::ActorClosed)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn actor_reports_partial_failure() {
    let mut rack = helpers::two_box_rack();
    let (handle, join) = spawn_group_actor(rack.take_group("all-sta").unwrap(), 8);

    let err = handle.set(35.0).await.unwrap_err();
    match err {
        RackError::Atten(atten) => assert_eq!(atten.kind(), ErrorKind::LimitExceeded),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(handle.get().await.unwrap(), 0.0);

    drop(handle);
    let group = join.await.unwrap();
    assert_eq!(group.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn actor_rejects_non_finite_on_empty_group() {
    let (handle, join) = spawn_group_actor(Group::new("spare"), 4);

    handle.set(12.0).await.unwrap();
    match handle.set(f64::NAN).await.unwrap_err() {
        RackError::Atten(atten) => assert_eq!(atten.kind(), ErrorKind::InvalidArgument),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(handle.get().await.unwrap(), 12.0);

    handle.shutdown().await;
    assert!(join.await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_see_whole_group_sets() {
    let mut rack = helpers::two_box_rack();
    let (handle, join) = spawn_group_actor(rack.take_group("ap").unwrap(), 32);

    let mut tasks = Vec::new();
    for step in 0..16u32 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle.set(f64::from(step)).await.unwrap();
            handle.is_synchronized().await.unwrap()
        }));
    }

    for task in tasks {
        // Another caller may have set a new value in between, but never
        // half way through a group set
        assert!(task.await.unwrap());
    }
    assert!(handle.is_synchronized().await.unwrap());

    handle.shutdown().await;
    join.await.unwrap();
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn offsets_validated_against_channel_count(count in 0usize..12, given in 0usize..12) {
            let mut inst = InstrumentConfig::simulated("SIM-N", count, 60.0);
            inst.offsets = Some(vec![0.5; given]);
            let config = RackConfig { instruments: vec![inst], groups: Vec::new() };

            match config.validate() {
                Ok(()) => prop_assert!(given >= count),
                Err(ConfigError::MissingOffsets { given: g, channel_count, .. }) => {
                    prop_assert!(given < count);
                    prop_assert_eq!(g, given);
                    prop_assert_eq!(channel_count, count);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        #[test]
        fn built_rack_has_one_attenuator_per_channel(counts in prop::collection::vec(1usize..8, 1..4)) {
            let config = RackConfig {
                instruments: counts
                    .iter()
                    .map(|count| InstrumentConfig::simulated("SIM-N", *count, 60.0))
                    .collect(),
                groups: Vec::new(),
            };

            let rack = Rack::build(&config, &DriverRegistry::new()).unwrap();
            prop_assert_eq!(rack.attenuators().count(), counts.iter().sum::<usize>());
        }
    }
}
