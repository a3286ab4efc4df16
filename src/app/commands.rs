//! Inbound commands to the hand service.
//!
//! These represent the operations a GUI, CLI or network bridge asks for.
//! [`HandService::execute`](super::service::HandService::execute) runs one
//! command as a single logical operation under the bus lock.

use std::collections::BTreeMap;

use crate::kinematics::hand::HandState;
use crate::params::HandParams;

/// Commands that outside collaborators can send into the core.
#[derive(Debug, Clone, PartialEq)]
pub enum HandCommand {
    /// Configure every joint servo.
    BringUp,

    /// Set one joint's angle and send it.
    MoveJoint {
        finger: String,
        joint: String,
        angle_deg: f64,
        duration_ms: u32,
    },

    /// Send the cached state of the named fingers.
    MoveFingers {
        fingers: Vec<String>,
        duration_ms: u32,
    },

    /// Update cached angles of one finger without sending.
    SetJointAngles {
        finger: String,
        angles: Vec<(String, f64)>,
    },

    /// Torque on every registered servo.
    SetTorque(bool),

    /// Set and persist a calibration offset.
    SetCalibrationOffset {
        finger: String,
        joint: String,
        offset: i32,
    },

    /// Nudge a calibration offset by one step and re-send the joint.
    StepCalibration {
        finger: String,
        joint: String,
        direction: i32,
    },

    GetHandState,

    /// Replace cached state without sending.
    SetHandState(HandState),

    ReadJointPosition { finger: String, joint: String },

    ReadTemperatures,

    GetParams,
}

/// Result payload of a successfully executed [`HandCommand`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Done,
    /// Number of servos configured and rejected by a bring-up.
    BroughtUp { configured: usize, rejected: usize },
    HandState(HandState),
    Offset(i32),
    AngleDeg(f64),
    Temperatures(BTreeMap<u8, u8>),
    Params(HandParams),
}
