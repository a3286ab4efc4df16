//! Hand aggregate: mapping, calibration and cached state against the mock bus.

use dexhand::Error;
use dexhand::adapters::log_sink::RecordingEventSink;
use dexhand::adapters::param_file::MemoryParamStore;
use dexhand::app::events::HandEvent;
use dexhand::config::HandConfig;
use dexhand::kinematics::hand::Hand;
use dexhand::kinematics::joint::JointState;
use dexhand::params::{HandParams, JointParams};
use dexhand::servo::OperatingMode;
use dexhand::servo::control_table::{ServoModel, TORQUE_ENABLE};

use super::mock_bus::{Call, MockBus};

type TestHand = Hand<MockBus, MemoryParamStore, RecordingEventSink>;

fn joint(id: u8, min: i32, max: i32, min_deg: f64, max_deg: f64, offset: i32) -> JointParams {
    JointParams {
        id,
        min,
        max,
        neutral: None,
        min_deg,
        max_deg,
        reverse: false,
        offset,
        model: None,
    }
}

fn params() -> HandParams {
    let mut p = HandParams::new();
    p.insert("thumb", "mcp", joint(2, 2200, 5000, 0.0, 80.0, 100)).unwrap();
    p.insert("index", "mcp", joint(7, 1000, 2800, 0.0, 90.0, 0)).unwrap();
    p.insert("index", "pip", joint(8, 1000, 2800, 0.0, 90.0, 0)).unwrap();
    p
}

fn hand_on(ids: impl IntoIterator<Item = u8>) -> TestHand {
    hand_with_config(ids, HandConfig::default())
}

fn hand_with_config(ids: impl IntoIterator<Item = u8>, config: HandConfig) -> TestHand {
    let mut hand = Hand::new(
        MockBus::with_ids(ids),
        MemoryParamStore::new(params()),
        RecordingEventSink::default(),
        config,
    )
    .unwrap();
    hand.bring_up();
    hand.bus_mut().transport_mut().clear();
    hand
}

fn goal_address() -> u16 {
    ServoModel::Xc330.table().goal_position.address
}

#[test]
fn bring_up_configures_every_joint() {
    let hand = hand_on([2, 7, 8]);
    assert_eq!(hand.bus().registry().ids(), vec![2, 7, 8]);
    assert!(hand.events().events.contains(&HandEvent::BringupComplete {
        configured: 3,
        rejected: 0
    }));
}

#[test]
fn reduced_actuator_set_keeps_working() {
    let mut hand = hand_on([2, 7]);
    assert_eq!(hand.bus().registry().ids(), vec![2, 7]);
    assert!(hand.events().events.contains(&HandEvent::BringupComplete {
        configured: 2,
        rejected: 1
    }));
    assert!(
        hand.events()
            .events
            .iter()
            .any(|e| matches!(e, HandEvent::ServoRejected { id: 8, .. }))
    );
    hand.move_joint("thumb", "mcp", 10.0, 500).unwrap();
}

fn motions_sent(hand: &TestHand) -> usize {
    hand.events()
        .events
        .iter()
        .filter(|e| matches!(e, HandEvent::MotionSent { .. }))
        .count()
}

#[test]
fn moving_rejected_joint_fails_without_traffic() {
    let mut hand = hand_on([2, 7]);
    let before = hand.get_hand_state();
    let sent = motions_sent(&hand);

    assert_eq!(
        hand.move_joint("index", "pip", 45.0, 500),
        Err(Error::UnknownId(8))
    );
    assert!(hand.bus().transport().calls.is_empty());
    assert_eq!(hand.get_hand_state(), before);
    assert_eq!(motions_sent(&hand), sent);

    hand.move_joint("index", "mcp", 45.0, 500).unwrap();
    assert_eq!(motions_sent(&hand), sent + 1);
}

#[test]
fn goal_past_limits_fails_without_traffic() {
    let config = HandConfig {
        operating_mode: OperatingMode::Position,
        ..HandConfig::default()
    };
    let mut hand = hand_with_config([2, 7, 8], config);
    let before = hand.get_hand_state();

    // 80 degrees maps to 5000, the offset pushes the goal to 5100.
    assert_eq!(
        hand.move_joint("thumb", "mcp", 80.0, 500),
        Err(Error::GoalOutOfLimits { id: 2, goal: 5100 })
    );
    assert!(hand.bus().transport().calls.is_empty());
    assert_eq!(hand.get_hand_state(), before);

    hand.move_joint("thumb", "mcp", 40.0, 500).unwrap();
    let goals = hand
        .bus()
        .transport()
        .sync_writes_to(ServoModel::Xc330.table().goal_position);
    assert_eq!(goals, vec![vec![(2, 3700)]]);
}

#[test]
fn move_joint_applies_offset_at_transmission() {
    let mut hand = hand_on([2, 7, 8]);
    hand.move_joint("thumb", "mcp", 40.0, 800).unwrap();

    let calls = &hand.bus().transport().calls;
    assert_eq!(
        calls[0],
        Call::SyncWrite {
            address: TORQUE_ENABLE.address,
            entries: vec![(2, 1)],
        }
    );
    let goals = hand
        .bus()
        .transport()
        .sync_writes_to(ServoModel::Xc330.table().goal_position);
    assert_eq!(goals, vec![vec![(2, 3700)]]);

    let state = hand.get_hand_state();
    assert_eq!(state["thumb"]["mcp"].count, 3600);
    assert!((state["thumb"]["mcp"].angle_deg - 40.0).abs() < f64::EPSILON);
}

#[test]
fn out_of_range_angle_saturates() {
    let mut hand = hand_on([2, 7, 8]);
    hand.move_joint("thumb", "mcp", 120.0, 800).unwrap();
    assert_eq!(hand.get_hand_state()["thumb"]["mcp"].count, 5000);
}

#[test]
fn unknown_names_fail_before_traffic() {
    let mut hand = hand_on([2, 7, 8]);
    assert_eq!(
        hand.move_joint("little", "mcp", 0.0, 100),
        Err(Error::UnknownFinger("little".into()))
    );
    assert!(matches!(
        hand.move_joint("thumb", "dip", 0.0, 100),
        Err(Error::UnknownJoint { .. })
    ));
    assert!(hand.move_fingers(&["index", "little"], 100).is_err());
    assert!(hand.bus().transport().calls.is_empty());
}

#[test]
fn move_fingers_sends_one_batch() {
    let mut hand = hand_on([2, 7, 8]);
    hand.set_joint_angles("index", &[("mcp", 45.0), ("pip", 90.0)])
        .unwrap();
    assert!(hand.bus().transport().calls.is_empty());

    hand.move_fingers(&["thumb", "index"], 600).unwrap();
    let writes = hand.bus().transport().sync_writes();
    assert_eq!(writes.len(), 2);
    let goals: Vec<_> = writes
        .iter()
        .filter(|(a, _)| *a == goal_address())
        .collect();
    assert_eq!(goals[0].1, vec![(2, 2300), (7, 1900), (8, 2800)]);
}

#[test]
fn torque_applies_to_every_registered_servo() {
    let mut hand = hand_on([2, 8]);
    hand.set_torque(true).unwrap();
    assert_eq!(
        hand.bus().transport().sync_writes_to(TORQUE_ENABLE),
        vec![vec![(2, 1), (8, 1)]]
    );
    assert!(hand.bus().registry().iter().all(|s| s.torque_enabled));

    hand.set_finger_torque("index", false).unwrap();
    assert!(!hand.bus().registry().lookup(8).unwrap().torque_enabled);
    assert!(hand.bus().registry().lookup(2).unwrap().torque_enabled);
}

#[test]
fn calibration_offset_persists() {
    let mut hand = hand_on([2, 7, 8]);
    hand.set_calibration_offset("index", "pip", -75).unwrap();

    let saved = hand.store().saved().unwrap();
    assert_eq!(saved.joint("index", "pip").unwrap().offset, -75);
    assert_eq!(hand.store().save_count(), 1);
    assert!(hand.events().events.contains(&HandEvent::CalibrationCommitted {
        finger: "index".into(),
        joint: "pip".into(),
        offset: -75,
    }));
    // No motion until asked.
    assert!(hand.bus().transport().calls.is_empty());
}

#[test]
fn failed_save_restores_previous_offset() {
    let mut store = MemoryParamStore::new(params());
    store.fail_saves = true;
    let mut hand = Hand::new(
        MockBus::with_ids([2, 7, 8]),
        store,
        RecordingEventSink::default(),
        HandConfig::default(),
    )
    .unwrap();

    assert!(matches!(
        hand.set_calibration_offset("thumb", "mcp", 400),
        Err(Error::Store(_))
    ));
    assert_eq!(hand.params().joint("thumb", "mcp").unwrap().offset, 100);
}

#[test]
fn step_calibration_nudges_and_moves() {
    let mut hand = hand_on([2, 7, 8]);
    hand.move_joint("thumb", "mcp", 40.0, 800).unwrap();
    hand.bus_mut().transport_mut().clear();

    let offset = hand.step_calibration("thumb", "mcp", 1).unwrap();
    assert_eq!(offset, 200);
    let goals = hand
        .bus()
        .transport()
        .sync_writes_to(ServoModel::Xc330.table().goal_position);
    assert_eq!(goals, vec![vec![(2, 3800)]]);
    assert_eq!(hand.get_hand_state()["thumb"]["mcp"].count, 3600);

    assert_eq!(hand.step_calibration("thumb", "mcp", -5).unwrap(), 100);
}

#[test]
fn set_hand_state_is_all_or_nothing() {
    let mut hand = hand_on([2, 7, 8]);
    let before = hand.get_hand_state();

    let mut bad = before.clone();
    bad.get_mut("index").unwrap().insert(
        "dip".into(),
        JointState {
            angle_deg: 1.0,
            count: 1100,
        },
    );
    bad.get_mut("thumb").unwrap().insert(
        "mcp".into(),
        JointState {
            angle_deg: 20.0,
            count: 2900,
        },
    );
    assert!(hand.set_hand_state(&bad).is_err());
    assert_eq!(hand.get_hand_state(), before);

    let mut good = before.clone();
    good.get_mut("thumb").unwrap().insert(
        "mcp".into(),
        JointState {
            angle_deg: 20.0,
            count: 2900,
        },
    );
    hand.set_hand_state(&good).unwrap();
    assert_eq!(hand.get_hand_state(), good);
    assert!(hand.bus().transport().calls.is_empty());
}

#[test]
fn read_joint_position_inverts_map() {
    let mut hand = hand_on([2, 7, 8]);
    let table = ServoModel::Xc330.table();
    hand.bus_mut()
        .transport_mut()
        .set(2, table.present_position, 3700);
    let angle = hand.read_joint_position("thumb", "mcp").unwrap();
    assert!((angle - 40.0).abs() < 1e-9);
}

#[test]
fn temperatures_of_registered_joints() {
    let mut hand = hand_on([2, 7]);
    let table = ServoModel::Xc330.table();
    hand.bus_mut()
        .transport_mut()
        .set(7, table.present_temperature, 44);
    let temps = hand.temperatures();
    assert_eq!(temps.get(&7), Some(&44));
    assert!(!temps.contains_key(&8));
}

#[test]
fn invalid_params_rejected_at_construction() {
    let mut p = params();
    p.insert("index", "dip", joint(2, 0, 100, 0.0, 10.0, 0)).unwrap();
    let result = Hand::new(
        MockBus::with_ids([]),
        MemoryParamStore::new(p),
        RecordingEventSink::default(),
        HandConfig::default(),
    );
    assert!(matches!(result, Err(Error::InvalidParams(_))));
}
