//! `Hand` — the caller-facing aggregate.
//!
//! Owns the [`ServoBus`] (and with it the registry), the fingers built from
//! the persisted parameter set, the parameter store and the event sink.
//! Every operation here runs synchronously on the caller's thread; wrap
//! the hand in [`HandService`](crate::app::service::HandService) to share
//! it between threads.

use std::collections::BTreeMap;

use log::{debug, error, info, warn};

use crate::app::events::HandEvent;
use crate::app::ports::{BusTransport, EventSink, ParamStore};
use crate::config::HandConfig;
use crate::error::{Error, Result};
use crate::params::HandParams;
use crate::servo::bringup::{ConfigurationReport, ServoSpec};
use crate::servo::bus::ServoBus;
use crate::servo::OperatingMode;

use super::finger::{Finger, FingerState, MotionBatch};

/// finger name → joint name → cached state
pub type HandState = BTreeMap<String, FingerState>;

pub struct Hand<T: BusTransport, S: ParamStore, E: EventSink> {
    bus: ServoBus<T>,
    store: S,
    events: E,
    config: HandConfig,
    /// In `config.finger_order`, then any remaining fingers by name.
    fingers: Vec<Finger>,
}

impl<T: BusTransport, S: ParamStore, E: EventSink> Hand<T, S, E> {
    /// Load and validate the parameter set from `store`, then build the
    /// fingers.  No bus traffic; call [`bring_up`](Self::bring_up) next.
    pub fn new(transport: T, store: S, events: E, config: HandConfig) -> Result<Self> {
        config.validate()?;
        let params = store.load()?;
        params.validate()?;

        let mut fingers: Vec<Finger> = Vec::new();
        for name in &config.finger_order {
            match params.finger(name) {
                Some(p) => fingers.push(Finger::from_params(name, p)),
                None => warn!("finger {name}: listed in config but has no parameters"),
            }
        }
        for (name, p) in params.fingers() {
            if !config.finger_order.contains(name) {
                fingers.push(Finger::from_params(name, p));
            }
        }
        info!(
            "hand: {} finger(s), {} joint(s)",
            fingers.len(),
            params.joint_count()
        );

        Ok(Self {
            bus: ServoBus::new(transport, config.servo_model),
            store,
            events,
            config,
            fingers,
        })
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn bus(&self) -> &ServoBus<T> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut ServoBus<T> {
        &mut self.bus
    }

    pub fn config(&self) -> &HandConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn fingers(&self) -> impl Iterator<Item = &Finger> {
        self.fingers.iter()
    }

    pub fn finger(&self, name: &str) -> Option<&Finger> {
        self.fingers.iter().find(|f| f.name() == name)
    }

    // ── Bring-up ──────────────────────────────────────────────

    /// Run the configuration pipeline for every joint servo.
    ///
    /// Servos that fail are left unregistered and the rest keep working,
    /// so the hand can run with a reduced set.  One report per joint.
    pub fn bring_up(&mut self) -> Vec<ConfigurationReport> {
        let mode = self.config.operating_mode;
        let mut reports = Vec::new();

        for joint in self.fingers.iter().flat_map(Finger::joints) {
            let model = joint.model().unwrap_or(self.config.servo_model);
            let mut builder = ServoSpec::builder(joint.id(), model.name())
                .operating_mode(mode)
                .reverse(joint.reverse())
                .secondary_id(self.config.secondary_id);
            if mode != OperatingMode::ExtendedPosition {
                let (lo, hi) = joint.map().bounds();
                builder = builder.position_limits(lo, hi);
            }
            let spec = match builder.build() {
                Ok(spec) => spec,
                Err(e) => {
                    error!("{}/{}: servo {} not configured: {e}", joint.finger(), joint.name(), joint.id());
                    self.events.emit(&HandEvent::ServoRejected {
                        id: joint.id(),
                        failed_steps: Vec::new(),
                    });
                    continue;
                }
            };

            let report = self.bus.configure_servo_with_report(&spec);
            let event = if report.committed {
                HandEvent::ServoConfigured {
                    id: report.id,
                    firmware_version: report.firmware_version,
                    temperature_c: report.temperature_c,
                }
            } else {
                HandEvent::ServoRejected {
                    id: report.id,
                    failed_steps: report.failed_steps().map(|o| o.step).collect(),
                }
            };
            self.events.emit(&event);
            reports.push(report);
        }

        let configured = reports.iter().filter(|r| r.committed).count();
        let rejected = self.joint_count() - configured;
        info!("hand: bring-up done, {configured} configured, {rejected} rejected");
        self.events.emit(&HandEvent::BringupComplete {
            configured,
            rejected,
        });
        reports
    }

    // ── Motion ────────────────────────────────────────────────

    /// Set one joint's angle, enable its torque and send it.
    ///
    /// Fails with [`Error::UnknownId`] if the joint's servo is not
    /// registered and [`Error::GoalOutOfLimits`] if the offset goal lies
    /// outside its position limits.  Either way the cached state is left
    /// unchanged and nothing is sent.
    pub fn move_joint(
        &mut self,
        finger: &str,
        joint: &str,
        angle_deg: f64,
        duration_ms: u32,
    ) -> Result<()> {
        let j = finger_mut(&mut self.fingers, finger)?.require_joint_mut(joint)?;
        let id = j.id();
        let goal = j.map().count_for(angle_deg).saturating_add(j.offset());
        let servo = self.bus.registry().lookup(id).ok_or(Error::UnknownId(id))?;
        if !servo.position_limits.contains(goal) {
            warn!("{finger}/{joint}: goal {goal} outside limits of servo {id}");
            return Err(Error::GoalOutOfLimits { id, goal });
        }
        j.set_angle(angle_deg);
        debug!("{finger}/{joint}: {angle_deg:.1}\u{00b0} -> goal {goal}");

        self.bus.set_torque(&[id], true)?;
        let mut batch = MotionBatch::default();
        batch.push(id, goal, duration_ms);
        batch.send(&mut self.bus)?;
        self.events.emit(&HandEvent::MotionSent {
            ids: vec![id],
            duration_ms,
        });
        Ok(())
    }

    /// Send the cached state of every named finger in one synchronized
    /// batch.  Unknown names fail before any traffic.
    pub fn move_fingers(&mut self, fingers: &[&str], duration_ms: u32) -> Result<()> {
        let mut batch = MotionBatch::default();
        for name in fingers {
            find_finger(&self.fingers, name)?.extend_batch(&mut batch, duration_ms);
        }
        if batch.is_empty() {
            return Ok(());
        }
        batch.send(&mut self.bus)?;
        self.events.emit(&HandEvent::MotionSent {
            ids: batch.ids,
            duration_ms,
        });
        Ok(())
    }

    /// Send every finger, in configured order.
    pub fn move_all(&mut self, duration_ms: u32) -> Result<()> {
        let names: Vec<String> = self.fingers.iter().map(|f| f.name().to_string()).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.move_fingers(&names, duration_ms)
    }

    // ── Torque ────────────────────────────────────────────────

    /// Switch torque on every registered servo.
    pub fn set_torque(&mut self, enable: bool) -> Result<()> {
        let ids = self.bus.registry().ids();
        self.bus.set_torque(&ids, enable)?;
        if !ids.is_empty() {
            self.events.emit(&HandEvent::TorqueChanged { ids, enabled: enable });
        }
        Ok(())
    }

    /// Switch torque on the registered servos of one finger.
    pub fn set_finger_torque(&mut self, finger: &str, enable: bool) -> Result<()> {
        let f = find_finger(&self.fingers, finger)?;
        f.set_torque(&mut self.bus, enable)?;
        let ids: Vec<u8> = f
            .ids()
            .into_iter()
            .filter(|&id| self.bus.registry().contains(id))
            .collect();
        if !ids.is_empty() {
            self.events.emit(&HandEvent::TorqueChanged { ids, enabled: enable });
        }
        Ok(())
    }

    // ── Calibration ───────────────────────────────────────────

    /// Set a joint's calibration offset and persist the parameter set.
    ///
    /// If the save fails the previous offset is restored.
    pub fn set_calibration_offset(&mut self, finger: &str, joint: &str, offset: i32) -> Result<()> {
        let j = finger_mut(&mut self.fingers, finger)?.require_joint_mut(joint)?;
        let previous = j.offset();
        j.set_offset(offset);

        let params = self.params();
        if let Err(e) = self.store.save(&params) {
            error!("{finger}/{joint}: offset not saved ({e}), keeping {previous}");
            finger_mut(&mut self.fingers, finger)?
                .require_joint_mut(joint)?
                .set_offset(previous);
            return Err(e.into());
        }

        info!("{finger}/{joint}: offset set to {offset}");
        self.events.emit(&HandEvent::CalibrationCommitted {
            finger: finger.to_string(),
            joint: joint.to_string(),
            offset,
        });
        Ok(())
    }

    /// Nudge a joint's offset by one calibration step in the direction of
    /// `direction`'s sign, persist it, and re-send the joint at its cached
    /// angle.  Returns the new offset.
    pub fn step_calibration(&mut self, finger: &str, joint: &str, direction: i32) -> Result<i32> {
        let j = find_finger(&self.fingers, finger)?
            .joint(joint)
            .ok_or_else(|| Error::UnknownJoint {
                finger: finger.to_string(),
                joint: joint.to_string(),
            })?;
        let offset = j
            .offset()
            .saturating_add(self.config.calibration_step.saturating_mul(direction.signum()));
        let angle = j.state().angle_deg;

        self.set_calibration_offset(finger, joint, offset)?;
        self.move_joint(finger, joint, angle, self.config.default_duration_ms)?;
        Ok(offset)
    }

    // ── Cached state ──────────────────────────────────────────

    pub fn get_hand_state(&self) -> HandState {
        self.fingers
            .iter()
            .map(|f| (f.name().to_string(), f.state()))
            .collect()
    }

    /// Bulk-assign cached state without transmitting.  Every finger and
    /// joint name is checked before anything changes.
    pub fn set_hand_state(&mut self, state: &HandState) -> Result<()> {
        for (finger, joints) in state {
            find_finger(&self.fingers, finger)?.check_joints(joints.keys().map(String::as_str))?;
        }
        for (finger, joints) in state {
            finger_mut(&mut self.fingers, finger)?.set_state(joints)?;
        }
        debug!("hand: cached state replaced for {} finger(s)", state.len());
        Ok(())
    }

    /// Update cached angles of one finger without transmitting.
    pub fn set_joint_angles(&mut self, finger: &str, angles: &[(&str, f64)]) -> Result<()> {
        finger_mut(&mut self.fingers, finger)?.set_angles(angles)
    }

    // ── Feedback ──────────────────────────────────────────────

    /// Read a joint's present position and map it back to degrees.
    pub fn read_joint_position(&mut self, finger: &str, joint: &str) -> Result<f64> {
        let j = find_finger(&self.fingers, finger)?
            .joint(joint)
            .ok_or_else(|| Error::UnknownJoint {
                finger: finger.to_string(),
                joint: joint.to_string(),
            })?;
        let present = self.bus.read_present_position(j.id())?;
        Ok(j.angle_from_present(present))
    }

    /// Temperature of every registered joint servo that answers.
    pub fn temperatures(&mut self) -> BTreeMap<u8, u8> {
        let ids: Vec<u8> = self.fingers.iter().flat_map(Finger::ids).collect();
        self.bus.read_temperatures(&ids)
    }

    // ── Parameters ────────────────────────────────────────────

    /// Snapshot of the parameter set, carrying current offsets.
    pub fn params(&self) -> HandParams {
        let mut params = HandParams::new();
        for finger in &self.fingers {
            params.insert_finger(finger.name(), finger.params());
        }
        params
    }

    pub fn save_params(&mut self) -> Result<()> {
        let params = self.params();
        self.store.save(&params)?;
        Ok(())
    }

    fn joint_count(&self) -> usize {
        self.fingers.iter().map(|f| f.joints().count()).sum()
    }
}

fn find_finger<'a>(fingers: &'a [Finger], name: &str) -> Result<&'a Finger> {
    fingers
        .iter()
        .find(|f| f.name() == name)
        .ok_or_else(|| Error::UnknownFinger(name.to_string()))
}

fn finger_mut<'a>(fingers: &'a mut [Finger], name: &str) -> Result<&'a mut Finger> {
    fingers
        .iter_mut()
        .find(|f| f.name() == name)
        .ok_or_else(|| Error::UnknownFinger(name.to_string()))
}
