//! Servo registry — the single source of truth for configured servos.
//!
//! Pure in-memory state; never talks to the bus.  Entries are only
//! inserted by the configuration pipeline after every bring-up step
//! succeeded, so a registered servo is always a fully configured one.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::{OperatingMode, PositionLimits, ServoDescriptor};

#[derive(Debug, Default)]
pub struct ServoRegistry {
    servos: BTreeMap<u8, ServoDescriptor>,
}

impl ServoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a descriptor.  Fails with [`Error::DuplicateId`] if the id is taken.
    pub fn register(&mut self, descriptor: ServoDescriptor) -> Result<()> {
        if self.servos.contains_key(&descriptor.id) {
            return Err(Error::DuplicateId(descriptor.id));
        }
        self.servos.insert(descriptor.id, descriptor);
        Ok(())
    }

    pub fn lookup(&self, id: u8) -> Option<&ServoDescriptor> {
        self.servos.get(&id)
    }

    /// Remove a servo.  Returns the descriptor if it was present.
    pub fn unregister(&mut self, id: u8) -> Option<ServoDescriptor> {
        self.servos.remove(&id)
    }

    pub fn update_limits(&mut self, id: u8, min: i32, max: i32) -> Result<()> {
        let servo = self.servos.get_mut(&id).ok_or(Error::UnknownId(id))?;
        servo.position_limits = PositionLimits::new(min, max);
        Ok(())
    }

    pub fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        let servo = self.servos.get_mut(&id).ok_or(Error::UnknownId(id))?;
        servo.operating_mode = mode;
        Ok(())
    }

    pub fn set_torque_enabled(&mut self, id: u8, enabled: bool) -> Result<()> {
        let servo = self.servos.get_mut(&id).ok_or(Error::UnknownId(id))?;
        servo.torque_enabled = enabled;
        Ok(())
    }

    pub(crate) fn get_mut(&mut self, id: u8) -> Option<&mut ServoDescriptor> {
        self.servos.get_mut(&id)
    }

    pub fn contains(&self, id: u8) -> bool {
        self.servos.contains_key(&id)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<u8> {
        self.servos.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServoDescriptor> {
        self.servos.values()
    }

    pub fn len(&self) -> usize {
        self.servos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servos.is_empty()
    }
}
