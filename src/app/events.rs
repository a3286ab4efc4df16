//! Outbound hand events.
//!
//! The [`Hand`](crate::kinematics::hand::Hand) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log, forward to a GUI, record.

use crate::servo::bringup::BringupStep;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum HandEvent {
    /// A servo passed every bring-up step and is registered.
    ServoConfigured {
        id: u8,
        firmware_version: Option<u8>,
        temperature_c: Option<u8>,
    },

    /// A servo failed bring-up and was discarded.
    ServoRejected { id: u8, failed_steps: Vec<BringupStep> },

    /// Every joint servo has been through bring-up.
    BringupComplete { configured: usize, rejected: usize },

    /// Torque was switched on a set of servos.
    TorqueChanged { ids: Vec<u8>, enabled: bool },

    /// A synchronized motion batch went out.
    MotionSent { ids: Vec<u8>, duration_ms: u32 },

    /// A calibration offset changed and the parameter set was saved.
    CalibrationCommitted {
        finger: String,
        joint: String,
        offset: i32,
    },
}
