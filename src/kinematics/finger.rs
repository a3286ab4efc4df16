//! A named, ordered set of joints sharing aggregate operations.

use std::collections::BTreeMap;

use log::warn;

use crate::app::ports::BusTransport;
use crate::error::{Error, Result};
use crate::params::FingerParams;
use crate::servo::bus::ServoBus;

use super::joint::{Joint, JointState};

/// joint name → cached state
pub type FingerState = BTreeMap<String, JointState>;

/// Parallel `(ids, goals, durations)` sequences for one synchronized write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionBatch {
    pub ids: Vec<u8>,
    pub goals: Vec<i32>,
    pub durations_ms: Vec<u32>,
}

impl MotionBatch {
    pub fn push(&mut self, id: u8, goal: i32, duration_ms: u32) {
        self.ids.push(id);
        self.goals.push(goal);
        self.durations_ms.push(duration_ms);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn send<T: BusTransport>(&self, bus: &mut ServoBus<T>) -> Result<()> {
        bus.sync_goal_positions(&self.ids, &self.goals, &self.durations_ms)
    }
}

#[derive(Debug, Clone)]
pub struct Finger {
    name: String,
    joints: Vec<Joint>,
}

impl Finger {
    pub fn from_params(name: &str, params: &FingerParams) -> Self {
        Self {
            name: name.to_string(),
            joints: params
                .iter()
                .map(|(joint, p)| Joint::from_params(name, joint, p))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name() == name)
    }

    pub fn joint_mut(&mut self, name: &str) -> Option<&mut Joint> {
        self.joints.iter_mut().find(|j| j.name() == name)
    }

    /// Like [`joint_mut`](Self::joint_mut) but reports a miss as
    /// [`Error::UnknownJoint`].
    pub fn require_joint_mut(&mut self, name: &str) -> Result<&mut Joint> {
        let finger = self.name.clone();
        self.joint_mut(name).ok_or_else(|| Error::UnknownJoint {
            finger,
            joint: name.to_string(),
        })
    }

    pub fn ids(&self) -> Vec<u8> {
        self.joints.iter().map(Joint::id).collect()
    }

    pub fn state(&self) -> FingerState {
        self.joints
            .iter()
            .map(|j| (j.name().to_string(), j.state()))
            .collect()
    }

    /// Fail with `UnknownJoint` on the first name this finger lacks.
    pub fn check_joints<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for name in names {
            if self.joint(name).is_none() {
                return Err(Error::UnknownJoint {
                    finger: self.name.clone(),
                    joint: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Update cached angles.  All names are checked before any joint
    /// changes.
    pub fn set_angles(&mut self, angles: &[(&str, f64)]) -> Result<()> {
        self.check_joints(angles.iter().map(|(name, _)| *name))?;
        for (name, angle) in angles {
            self.require_joint_mut(name)?.set_angle(*angle);
        }
        Ok(())
    }

    /// Assign cached state.  All names are checked before any joint
    /// changes.
    pub fn set_state(&mut self, state: &FingerState) -> Result<()> {
        self.check_joints(state.keys().map(String::as_str))?;
        for (name, s) in state {
            self.require_joint_mut(name)?.set_state(*s);
        }
        Ok(())
    }

    /// Append every joint's offset-adjusted goal to `batch`.
    pub fn extend_batch(&self, batch: &mut MotionBatch, duration_ms: u32) {
        for joint in &self.joints {
            batch.push(joint.id(), joint.goal_count(), duration_ms);
        }
    }

    /// Send every joint's cached count in one synchronized batch.
    pub fn move_all<T: BusTransport>(&self, bus: &mut ServoBus<T>, duration_ms: u32) -> Result<()> {
        let mut batch = MotionBatch::default();
        self.extend_batch(&mut batch, duration_ms);
        batch.send(bus)
    }

    pub fn set_torque<T: BusTransport>(&self, bus: &mut ServoBus<T>, enable: bool) -> Result<()> {
        bus.set_torque(&self.ids(), enable)
    }

    /// Persisted form, joints in their original order.
    pub fn params(&self) -> FingerParams {
        let mut params = FingerParams::new();
        for joint in &self.joints {
            // Built from a `FingerParams`, so the joints always fit.
            if params.insert(joint.name().to_string(), joint.params()).is_err() {
                warn!("{}/{}: no room in parameter set, skipped", self.name, joint.name());
            }
        }
        params
    }
}
