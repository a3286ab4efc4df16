//! Hand service — the shared, thread-safe entry point.
//!
//! [`HandService`] wraps one [`Hand`] in `Arc<parking_lot::Mutex<_>>`.
//! Each call holds the lock for the whole logical operation, so a GUI
//! thread and a bridge thread never interleave transactions on the bus.
//!
//! ```text
//!  GUI ──┐                 ┌────────────────────┐
//!  CLI ──┼─▶ HandCommand ─▶│ HandService (lock) │──▶ Hand ──▶ ServoBus ──▶ BusTransport
//!  RPC ──┘                 └────────────────────┘
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::kinematics::hand::Hand;

use super::commands::{CommandReply, HandCommand};
use super::ports::{BusTransport, EventSink, ParamStore};

// ───────────────────────────────────────────────────────────────
// HandService
// ───────────────────────────────────────────────────────────────

pub struct HandService<T: BusTransport, S: ParamStore, E: EventSink> {
    hand: Arc<Mutex<Hand<T, S, E>>>,
}

impl<T: BusTransport, S: ParamStore, E: EventSink> Clone for HandService<T, S, E> {
    fn clone(&self) -> Self {
        Self {
            hand: Arc::clone(&self.hand),
        }
    }
}

impl<T: BusTransport, S: ParamStore, E: EventSink> HandService<T, S, E> {
    pub fn new(hand: Hand<T, S, E>) -> Self {
        Self {
            hand: Arc::new(Mutex::new(hand)),
        }
    }

    /// Run `f` with exclusive access to the hand.
    pub fn with_hand<R>(&self, f: impl FnOnce(&mut Hand<T, S, E>) -> R) -> R {
        let mut hand = self.hand.lock();
        f(&mut hand)
    }

    /// Execute one command as a single locked operation.
    pub fn execute(&self, command: HandCommand) -> Result<CommandReply> {
        let mut hand = self.hand.lock();
        match command {
            HandCommand::BringUp => {
                let reports = hand.bring_up();
                let configured = reports.iter().filter(|r| r.committed).count();
                Ok(CommandReply::BroughtUp {
                    configured,
                    rejected: reports.len() - configured,
                })
            }
            HandCommand::MoveJoint {
                finger,
                joint,
                angle_deg,
                duration_ms,
            } => {
                hand.move_joint(&finger, &joint, angle_deg, duration_ms)?;
                Ok(CommandReply::Done)
            }
            HandCommand::MoveFingers {
                fingers,
                duration_ms,
            } => {
                let names: Vec<&str> = fingers.iter().map(String::as_str).collect();
                hand.move_fingers(&names, duration_ms)?;
                Ok(CommandReply::Done)
            }
            HandCommand::SetJointAngles { finger, angles } => {
                let angles: Vec<(&str, f64)> =
                    angles.iter().map(|(j, a)| (j.as_str(), *a)).collect();
                hand.set_joint_angles(&finger, &angles)?;
                Ok(CommandReply::Done)
            }
            HandCommand::SetTorque(enable) => {
                hand.set_torque(enable)?;
                Ok(CommandReply::Done)
            }
            HandCommand::SetCalibrationOffset {
                finger,
                joint,
                offset,
            } => {
                hand.set_calibration_offset(&finger, &joint, offset)?;
                Ok(CommandReply::Offset(offset))
            }
            HandCommand::StepCalibration {
                finger,
                joint,
                direction,
            } => hand
                .step_calibration(&finger, &joint, direction)
                .map(CommandReply::Offset),
            HandCommand::GetHandState => Ok(CommandReply::HandState(hand.get_hand_state())),
            HandCommand::SetHandState(state) => {
                hand.set_hand_state(&state)?;
                Ok(CommandReply::Done)
            }
            HandCommand::ReadJointPosition { finger, joint } => hand
                .read_joint_position(&finger, &joint)
                .map(CommandReply::AngleDeg),
            HandCommand::ReadTemperatures => Ok(CommandReply::Temperatures(hand.temperatures())),
            HandCommand::GetParams => Ok(CommandReply::Params(hand.params())),
        }
    }
}
