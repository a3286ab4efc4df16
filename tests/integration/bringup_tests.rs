//! Configuration pipeline against the mock bus.

use dexhand::Error;
use dexhand::servo::bringup::{BringupStep, ServoSpec, StepFailure, StepStatus};
use dexhand::servo::bus::ServoBus;
use dexhand::servo::control_table::ServoModel;
use dexhand::servo::{OperatingMode, PositionLimits};

use super::mock_bus::{Call, MockBus};

fn bus(ids: impl IntoIterator<Item = u8>) -> ServoBus<MockBus> {
    let mut mock = MockBus::with_ids(ids);
    let table = ServoModel::Xc330.table();
    for id in 1..=20 {
        mock.set(id, table.firmware_version, 52);
        mock.set(id, table.present_temperature, 30);
    }
    ServoBus::new(mock, ServoModel::Xc330)
}

fn extended(id: u8) -> ServoSpec {
    ServoSpec::builder(id, "XC330")
        .operating_mode(OperatingMode::ExtendedPosition)
        .reverse(true)
        .build()
        .unwrap()
}

#[test]
fn successful_bringup_registers_full_descriptor() {
    let mut bus = bus([5]);
    let report = bus.configure_servo_with_report(&extended(5));

    assert!(report.committed);
    assert_eq!(report.outcomes.len(), 11);
    assert_eq!(report.firmware_version, Some(52));
    assert_eq!(report.temperature_c, Some(30));

    let servo = bus.registry().lookup(5).unwrap();
    assert_eq!(servo.model, ServoModel::Xc330);
    assert_eq!(servo.operating_mode, OperatingMode::ExtendedPosition);
    assert!(servo.drive_flags.reverse);
    assert!(servo.drive_flags.time_based_profile);
    assert!(!servo.drive_flags.torque_on_by_goal_update);
    assert_eq!(servo.secondary_id, 252);
    assert_eq!(servo.firmware_version, 52);
    assert!(!servo.torque_enabled);
    assert_eq!(servo.position_limits, PositionLimits::default());

    let table = ServoModel::Xc330.table();
    assert_eq!(bus.transport().get(5, table.drive_mode), 0b101);
    assert_eq!(bus.transport().get(5, table.operating_mode), 4);
}

#[test]
fn startup_config_restores_ram_and_clears_torque() {
    let mut bus = bus([5]);
    let table = ServoModel::Xc330.table();
    bus.transport_mut().set(5, table.startup_configuration, 0b01);
    bus.configure_servo(&extended(5)).unwrap();
    assert_eq!(bus.transport().get(5, table.startup_configuration), 0b10);
}

#[test]
fn duplicate_id_rejected_without_traffic() {
    let mut bus = bus([5]);
    bus.configure_servo(&extended(5)).unwrap();
    bus.transport_mut().clear();

    let err = bus.configure_servo(&extended(5)).unwrap_err();
    assert_eq!(err, Error::DuplicateId(5));
    assert_eq!(bus.registry().len(), 1);
    assert!(bus.transport().calls.is_empty());
}

#[test]
fn operating_mode_failure_leaves_servo_absent() {
    let mut bus = bus([5]);
    let table = ServoModel::Xc330.table();
    bus.transport_mut().fail(5, table.operating_mode);

    let report = bus.configure_servo_with_report(&extended(5));
    assert!(!report.committed);
    let failed: Vec<BringupStep> = report.failed_steps().map(|o| o.step).collect();
    assert_eq!(failed, vec![BringupStep::WriteOperatingMode]);
    assert!(bus.registry().lookup(5).is_none());

    // Later steps still ran.
    assert_eq!(bus.transport().writes_to(5, table.secondary_id), vec![252]);
    assert!(bus.transport().calls.contains(&Call::Read {
        id: 5,
        address: table.present_temperature.address
    }));

    assert_eq!(report.into_result(), Err(Error::ConfigurationFailed(5)));
}

#[test]
fn unsupported_model_has_no_bus_traffic() {
    let mut bus = bus([5]);
    let spec = ServoSpec::builder(5, "AX12")
        .operating_mode(OperatingMode::ExtendedPosition)
        .build()
        .unwrap();
    let report = bus.configure_servo_with_report(&spec);
    assert!(!report.committed);
    assert!(report.outcomes.iter().any(|o| o.status
        == StepStatus::Failed(StepFailure::UnsupportedModel)));
    assert!(bus.transport().calls.is_empty());
    assert_eq!(
        bus.configure_servo(&spec),
        Err(Error::UnsupportedModel("AX12".into()))
    );
}

#[test]
fn absent_servo_fails_every_bus_step() {
    let mut bus = bus([]);
    let report = bus.configure_servo_with_report(&extended(9));
    assert!(!report.committed);
    assert!(bus.registry().is_empty());
    // Reverse, time profile and the rest were each attempted.
    assert!(report.failed_steps().count() >= 6);
}

#[test]
fn position_mode_writes_limits_max_then_min() {
    let mut bus = bus([3]);
    let spec = ServoSpec::builder(3, "xc330")
        .operating_mode(OperatingMode::Position)
        .position_limits(1000, 3000)
        .build()
        .unwrap();
    bus.configure_servo(&spec).unwrap();

    let table = ServoModel::Xc330.table();
    let limit_writes: Vec<u16> = bus
        .transport()
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Write { address, .. }
                if *address == table.max_position_limit.address
                    || *address == table.min_position_limit.address =>
            {
                Some(*address)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        limit_writes,
        vec![
            table.max_position_limit.address,
            table.min_position_limit.address
        ]
    );
    assert_eq!(
        bus.registry().lookup(3).unwrap().position_limits,
        PositionLimits::new(1000, 3000)
    );
}

#[test]
fn reverse_not_requested_is_not_applicable() {
    let mut bus = bus([4]);
    let spec = ServoSpec::builder(4, "XC330")
        .operating_mode(OperatingMode::ExtendedPosition)
        .build()
        .unwrap();
    let report = bus.configure_servo_with_report(&spec);
    assert!(report.committed);
    let reverse = report
        .outcomes
        .iter()
        .find(|o| o.step == BringupStep::WriteReverse)
        .unwrap();
    assert_eq!(reverse.status, StepStatus::NotApplicable);
}

#[test]
fn single_servo_helpers_after_bringup() {
    let mut bus = bus([6]);
    bus.configure_servo(&extended(6)).unwrap();
    let table = ServoModel::Xc330.table();

    bus.write_position_limits(6, -500, 500).unwrap();
    assert_eq!(bus.read_position_limits(6).unwrap(), PositionLimits::new(-500, 500));
    assert_eq!(
        bus.write_position_limits(6, 10, 0),
        Err(Error::InvalidSpec("position limit min above max"))
    );

    bus.set_profile_time(6, 750).unwrap();
    assert_eq!(bus.transport().writes_to(6, table.profile_velocity), vec![750]);

    bus.set_torque_on_by_goal_update(6, true).unwrap();
    assert!(bus.registry().lookup(6).unwrap().drive_flags.torque_on_by_goal_update);

    bus.transport_mut().set(6, table.present_input_voltage, 74);
    assert!((bus.read_input_voltage(6).unwrap() - 7.4).abs() < 1e-4);

    assert_eq!(bus.read_present_position(99), Err(Error::UnknownId(99)));
    assert_eq!(bus.ping(6), Ok(1220));
}
