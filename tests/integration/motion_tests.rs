//! Synchronized motion controller against the mock bus.

use dexhand::Error;
use dexhand::app::ports::TransportError;
use dexhand::servo::OperatingMode;
use dexhand::servo::bringup::ServoSpec;
use dexhand::servo::bus::ServoBus;
use dexhand::servo::control_table::{ServoModel, TORQUE_ENABLE};

use super::mock_bus::{Call, MockBus};

/// Ids 1, 2 are XC330 limited to 0..=4095; ids 3, 4 are XM430 wide open.
fn configured_bus() -> ServoBus<MockBus> {
    let mut bus = ServoBus::new(MockBus::with_ids(1..=4), ServoModel::Xc330);
    for id in [1, 2] {
        let spec = ServoSpec::builder(id, "XC330")
            .operating_mode(OperatingMode::Position)
            .position_limits(0, 4095)
            .build()
            .unwrap();
        bus.configure_servo(&spec).unwrap();
    }
    for id in [3, 4] {
        let spec = ServoSpec::builder(id, "XM430")
            .operating_mode(OperatingMode::ExtendedPosition)
            .build()
            .unwrap();
        bus.configure_servo(&spec).unwrap();
    }
    bus.transport_mut().clear();
    bus
}

#[test]
fn malformed_batch_issues_no_traffic() {
    let mut bus = configured_bus();
    let err = bus.sync_goal_positions(&[1, 2], &[100], &[50, 50]).unwrap_err();
    assert!(matches!(err, Error::MalformedBatch { .. }));
    assert!(bus.transport().calls.is_empty());
}

#[test]
fn two_models_give_two_pairs_of_transactions() {
    let mut bus = configured_bus();
    bus.sync_goal_positions(&[3, 1, 4, 2], &[10, 20, 30, 40], &[500, 500, 500, 500])
        .unwrap();

    let table = ServoModel::Xc330.table();
    let writes = bus.transport().sync_writes();
    assert_eq!(writes.len(), 4);

    let durations = bus.transport().sync_writes_to(table.profile_velocity);
    let goals = bus.transport().sync_writes_to(table.goal_position);
    assert_eq!(durations.len(), 2);
    assert_eq!(goals.len(), 2);
    assert_eq!(goals[0], vec![(1, 20), (2, 40)]);
    assert_eq!(goals[1], vec![(3, 10), (4, 30)]);

    // Every duration goes out before any goal.
    assert_eq!(writes[0].0, table.profile_velocity.address);
    assert_eq!(writes[1].0, table.profile_velocity.address);
}

#[test]
fn transaction_count_independent_of_batch_size() {
    let mut bus = configured_bus();
    let ids = [1, 2, 3, 4, 1, 3];
    bus.sync_goal_positions(&ids, &[5, 6, 7, 8, 9, 10], &[100; 6])
        .unwrap();
    assert_eq!(bus.transport().sync_writes().len(), 4);
}

#[test]
fn repeated_ids_sent_once_last_entry_wins() {
    let mut bus = configured_bus();
    bus.sync_goal_positions(&[1, 2, 3, 4, 1, 3], &[5, 6, 7, 8, 9, 10], &[100, 100, 100, 100, 200, 300])
        .unwrap();

    let table = ServoModel::Xc330.table();
    let goals = bus.transport().sync_writes_to(table.goal_position);
    assert_eq!(goals, vec![vec![(1, 9), (2, 6)], vec![(3, 10), (4, 8)]]);
    let durations = bus.transport().sync_writes_to(table.profile_velocity);
    assert_eq!(
        durations,
        vec![vec![(1, 200), (2, 100)], vec![(3, 300), (4, 100)]]
    );
}

#[test]
fn out_of_range_goal_dropped_but_duration_sent() {
    let mut bus = configured_bus();
    bus.sync_goal_positions(&[1, 2], &[5000, 1000], &[300, 300])
        .unwrap();

    let table = ServoModel::Xc330.table();
    assert_eq!(
        bus.transport().sync_writes_to(table.profile_velocity),
        vec![vec![(1, 300), (2, 300)]]
    );
    assert_eq!(
        bus.transport().sync_writes_to(table.goal_position),
        vec![vec![(2, 1000)]]
    );
}

#[test]
fn negative_goal_encodes_twos_complement() {
    let mut bus = configured_bus();
    bus.sync_goal_positions(&[3], &[-2048], &[100]).unwrap();
    let table = ServoModel::Xm430.table();
    assert_eq!(
        bus.transport().sync_writes_to(table.goal_position),
        vec![vec![(3, (-2048i32) as u32)]]
    );
}

#[test]
fn goal_group_failure_reports_error_after_durations() {
    let mut bus = configured_bus();
    let table = ServoModel::Xc330.table();
    bus.transport_mut().fail_sync(table.goal_position);

    let err = bus
        .sync_goal_positions(&[1, 3], &[100, 100], &[200, 200])
        .unwrap_err();
    assert_eq!(err, Error::Transport(TransportError::Timeout));

    // Both duration groups went out; the goal register stopped at its
    // first failing group.
    assert_eq!(bus.transport().sync_writes_to(table.profile_velocity).len(), 2);
    assert_eq!(bus.transport().sync_writes_to(table.goal_position).len(), 1);
}

#[test]
fn torque_is_idempotent() {
    let mut bus = configured_bus();
    bus.set_torque(&[1, 2, 3, 4], true).unwrap();
    let first = bus.transport().calls.clone();
    let state_first: Vec<bool> = bus.registry().iter().map(|s| s.torque_enabled).collect();

    bus.transport_mut().clear();
    bus.set_torque(&[1, 2, 3, 4], true).unwrap();
    let second = bus.transport().calls.clone();
    let state_second: Vec<bool> = bus.registry().iter().map(|s| s.torque_enabled).collect();

    assert_eq!(first, second);
    assert_eq!(state_first, state_second);
    assert_eq!(state_first, vec![true; 4]);
    assert_eq!(
        first,
        vec![Call::SyncWrite {
            address: TORQUE_ENABLE.address,
            entries: vec![(1, 1), (2, 1), (3, 1), (4, 1)],
        }]
    );
}

#[test]
fn torque_skips_unregistered_ids() {
    let mut bus = configured_bus();
    bus.set_torque(&[2, 77], false).unwrap();
    assert_eq!(
        bus.transport().sync_writes_to(TORQUE_ENABLE),
        vec![vec![(2, 0)]]
    );

    bus.transport_mut().clear();
    bus.set_torque(&[77], true).unwrap();
    assert!(bus.transport().calls.is_empty());
}

#[test]
fn torque_sends_repeated_ids_once() {
    let mut bus = configured_bus();
    bus.set_torque(&[3, 1, 3], true).unwrap();
    assert_eq!(
        bus.transport().sync_writes_to(TORQUE_ENABLE),
        vec![vec![(3, 1), (1, 1)]]
    );
}

#[test]
fn unregistered_id_gets_duration_under_fallback_model() {
    let mut bus = configured_bus();
    bus.sync_goal_positions(&[1, 50], &[100, 100], &[400, 400])
        .unwrap();
    let table = ServoModel::Xc330.table();
    assert_eq!(
        bus.transport().sync_writes_to(table.profile_velocity),
        vec![vec![(1, 400), (50, 400)]]
    );
    assert_eq!(
        bus.transport().sync_writes_to(table.goal_position),
        vec![vec![(1, 100)]]
    );
}
