//! Synchronized motion controller.
//!
//! Turns a batch of `(id, goal_count, duration_ms)` entries into grouped
//! bus writes: one profile-duration transaction and one goal-position
//! transaction per servo model present in the batch, instead of two
//! single-servo writes per entry.
//!
//! ## Batch rules
//!
//! - The three input slices must have equal length, otherwise
//!   [`Error::MalformedBatch`] and no bus traffic.
//! - A goal is transmitted only if it lies inside the servo's position
//!   limits.  Out-of-range goals are dropped from the goal transaction.
//! - Every entry's duration is transmitted, including entries whose goal
//!   was dropped and entries whose id is not registered.  Unregistered ids
//!   are grouped under the bus's fallback model.
//! - An id that appears more than once is transmitted once per register
//!   with its last entry's values.
//! - Groups are not atomic: if the second model group fails, the first has
//!   already moved.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::app::ports::{BusTransport, TransportError};
use crate::error::{Error, Result};
use crate::servo::bus::ServoBus;
use crate::servo::control_table::{Register, RegisterBytes, ServoModel, TORQUE_ENABLE};
use crate::servo::registry::ServoRegistry;

/// Entries for one model, ready to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGroup {
    pub model: ServoModel,
    pub durations: Vec<(u8, RegisterBytes)>,
    pub goals: Vec<(u8, RegisterBytes)>,
}

/// Grouped form of a motion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    pub groups: Vec<ModelGroup>,
    /// Ids whose goal was outside limits or that are not registered.
    pub goals_dropped: Vec<u8>,
}

impl BatchPlan {
    /// Number of bus transactions this plan will issue.
    pub fn transaction_count(&self) -> usize {
        self.groups
            .iter()
            .map(|g| usize::from(!g.durations.is_empty()) + usize::from(!g.goals.is_empty()))
            .sum()
    }
}

/// Validate and group a batch without touching the bus.
pub fn plan_batch(
    registry: &ServoRegistry,
    fallback_model: ServoModel,
    ids: &[u8],
    goals: &[i32],
    durations_ms: &[u32],
) -> Result<BatchPlan> {
    if ids.len() != goals.len() || ids.len() != durations_ms.len() {
        return Err(Error::MalformedBatch {
            ids: ids.len(),
            goals: goals.len(),
            durations: durations_ms.len(),
        });
    }

    let mut groups: BTreeMap<ServoModel, ModelGroup> = BTreeMap::new();
    let mut goals_dropped = Vec::new();

    for ((&id, &goal), &duration) in ids.iter().zip(goals).zip(durations_ms) {
        let servo = registry.lookup(id);
        let model = servo.map_or(fallback_model, |s| s.model);
        let table = model.table();
        let group = groups.entry(model).or_insert_with(|| ModelGroup {
            model,
            durations: Vec::new(),
            goals: Vec::new(),
        });

        upsert(&mut group.durations, id, table.profile_velocity.encode(duration));

        match servo {
            Some(s) if s.position_limits.contains(goal) => {
                upsert(&mut group.goals, id, table.goal_position.encode(goal as u32));
                goals_dropped.retain(|&d| d != id);
            }
            Some(s) => {
                warn!(
                    "servo {id}: goal {goal} outside limits {}..={}, not sent",
                    s.position_limits.min, s.position_limits.max
                );
                group.goals.retain(|(g, _)| *g != id);
                if !goals_dropped.contains(&id) {
                    goals_dropped.push(id);
                }
            }
            None => {
                warn!("servo {id}: not registered, goal not sent");
                if !goals_dropped.contains(&id) {
                    goals_dropped.push(id);
                }
            }
        }
    }

    Ok(BatchPlan {
        groups: groups.into_values().collect(),
        goals_dropped,
    })
}

/// Replace the entry for `id`, or append one.
fn upsert(entries: &mut Vec<(u8, RegisterBytes)>, id: u8, bytes: RegisterBytes) {
    match entries.iter_mut().find(|(e, _)| *e == id) {
        Some(entry) => entry.1 = bytes,
        None => entries.push((id, bytes)),
    }
}

impl<T: BusTransport> ServoBus<T> {
    /// Send a motion batch as grouped duration + goal-position writes.
    ///
    /// Succeeds only if every grouped transaction succeeded.
    pub fn sync_goal_positions(
        &mut self,
        ids: &[u8],
        goals: &[i32],
        durations_ms: &[u32],
    ) -> Result<()> {
        let plan = plan_batch(&self.registry, self.fallback_model, ids, goals, durations_ms)?;
        self.execute_plan(&plan)
    }

    /// Transmit a prepared plan: all duration groups, then all goal groups.
    pub fn execute_plan(&mut self, plan: &BatchPlan) -> Result<()> {
        debug!(
            "motion batch: {} group(s), {} transaction(s)",
            plan.groups.len(),
            plan.transaction_count()
        );
        let durations = self.send_groups(
            plan.groups
                .iter()
                .map(|g| (g.model.table().profile_velocity, g.durations.as_slice())),
        );
        let goals = self.send_groups(
            plan.groups
                .iter()
                .map(|g| (g.model.table().goal_position, g.goals.as_slice())),
        );
        durations.and(goals).map_err(Error::from)
    }

    /// Enable or disable torque on every registered id in one grouped write.
    ///
    /// Unregistered ids are skipped and repeated ids sent once.  An empty
    /// effective set issues no traffic.
    pub fn set_torque(&mut self, ids: &[u8], enable: bool) -> Result<()> {
        let value = TORQUE_ENABLE.encode(u32::from(enable));
        let mut payload: Vec<(u8, RegisterBytes)> = Vec::with_capacity(ids.len());
        for &id in ids {
            if !self.registry.contains(id) {
                warn!("servo {id}: torque skipped, not registered");
            } else if !payload.iter().any(|(p, _)| *p == id) {
                payload.push((id, value.clone()));
            }
        }

        if payload.is_empty() {
            return Ok(());
        }

        self.transport.sync_write(TORQUE_ENABLE, &payload)?;
        for (id, _) in &payload {
            self.registry.set_torque_enabled(*id, enable)?;
        }
        debug!("torque {} on {} servo(s)", if enable { "on" } else { "off" }, payload.len());
        Ok(())
    }

    /// One transaction per non-empty group; stops at the first failure.
    fn send_groups<'a>(
        &mut self,
        groups: impl Iterator<Item = (Register, &'a [(u8, RegisterBytes)])>,
    ) -> core::result::Result<(), TransportError> {
        for (register, payload) in groups {
            if payload.is_empty() {
                continue;
            }
            self.transport.sync_write(register, payload)?;
        }
        Ok(())
    }
}
