//! `ServoBus` — the explicit context object that owns the bus.
//!
//! One `ServoBus` owns the [`BusTransport`] handle and the
//! [`ServoRegistry`].  Every bus operation in the crate goes through it,
//! so there is exactly one issuer of transactions and no global state.
//! The configuration pipeline ([`bringup`](super::bringup)) and the
//! synchronized motion controller ([`motion`](crate::motion)) extend it
//! with further `impl` blocks.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::app::ports::{BusTransport, TransportError};
use crate::error::{Error, Result};

use super::control_table::{ControlTable, ServoModel};
use super::registry::ServoRegistry;
use super::{DriveFlags, OperatingMode, PositionLimits, ServoDescriptor, with_bit};

pub struct ServoBus<T: BusTransport> {
    pub(crate) transport: T,
    pub(crate) registry: ServoRegistry,
    /// Register map used for batch entries whose id is not registered.
    pub(crate) fallback_model: ServoModel,
}

impl<T: BusTransport> ServoBus<T> {
    pub fn new(transport: T, fallback_model: ServoModel) -> Self {
        Self {
            transport,
            registry: ServoRegistry::new(),
            fallback_model,
        }
    }

    pub fn registry(&self) -> &ServoRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Forget a servo without touching the bus.
    pub fn unregister(&mut self, id: u8) -> Option<ServoDescriptor> {
        self.registry.unregister(id)
    }

    // ── Single-servo queries ─────────────────────────────────

    /// Ping a servo; returns its model number.  Works for unregistered ids.
    pub fn ping(&mut self, id: u8) -> Result<u16> {
        Ok(self.transport.ping(id)?)
    }

    pub fn reboot(&mut self, id: u8) -> Result<()> {
        self.descriptor(id)?;
        self.transport.reboot(id)?;
        info!("servo {id}: reboot issued");
        Ok(())
    }

    pub fn read_present_position(&mut self, id: u8) -> Result<i32> {
        let table = self.descriptor(id)?.table();
        let raw = self.transport.read(id, table.present_position)?;
        Ok(raw as i32)
    }

    /// Present input voltage in volts.
    pub fn read_input_voltage(&mut self, id: u8) -> Result<f32> {
        let table = self.descriptor(id)?.table();
        let raw = self.transport.read(id, table.present_input_voltage)?;
        Ok(raw as f32 / 10.0)
    }

    /// Read the temperature (°C) of each registered id.  Ids that are not
    /// registered or do not answer are left out of the result.
    pub fn read_temperatures(&mut self, ids: &[u8]) -> BTreeMap<u8, u8> {
        let mut out = BTreeMap::new();
        for &id in ids {
            let Some(servo) = self.registry.lookup(id) else {
                warn!("servo {id}: temperature skipped, not registered");
                continue;
            };
            let reg = servo.table().present_temperature;
            match self.transport.read(id, reg) {
                Ok(t) => {
                    out.insert(id, t as u8);
                }
                Err(e) => warn!("servo {id}: temperature read failed: {e}"),
            }
        }
        out
    }

    /// Read the position-limit registers from the servo itself.
    pub fn read_position_limits(&mut self, id: u8) -> Result<PositionLimits> {
        let table = self.descriptor(id)?.table();
        let max = self.transport.read(id, table.max_position_limit)? as i32;
        let min = self.transport.read(id, table.min_position_limit)? as i32;
        Ok(PositionLimits::new(min, max))
    }

    // ── Single-servo configuration ───────────────────────────

    /// Write both position-limit registers, then narrow the registry entry.
    pub fn write_position_limits(&mut self, id: u8, min: i32, max: i32) -> Result<()> {
        if min > max {
            return Err(Error::InvalidSpec("position limit min above max"));
        }
        let table = self.descriptor(id)?.table();
        write_limits(&mut self.transport, id, table, min, max)?;
        self.registry.update_limits(id, min, max)?;
        info!("servo {id}: limits {min} <-> {max}");
        Ok(())
    }

    pub fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        let table = self.descriptor(id)?.table();
        self.transport
            .write(id, table.operating_mode, u32::from(mode.register_value()))?;
        self.registry.set_operating_mode(id, mode)?;
        info!("servo {id}: operating mode {mode:?}");
        Ok(())
    }

    /// Set the motion duration of one servo.  Only meaningful when the
    /// servo runs time-based profiles.
    pub fn set_profile_time(&mut self, id: u8, duration_ms: u32) -> Result<()> {
        let servo = self.descriptor(id)?;
        if !servo.drive_flags.time_based_profile {
            return Err(Error::InvalidSpec("servo is not in time-based profile mode"));
        }
        let reg = servo.table().profile_velocity;
        self.transport.write(id, reg, duration_ms)?;
        debug!("servo {id}: profile time {duration_ms} ms");
        Ok(())
    }

    pub fn set_torque_on_by_goal_update(&mut self, id: u8, on: bool) -> Result<()> {
        let table = self.descriptor(id)?.table();
        let raw = update_drive_bit(
            &mut self.transport,
            id,
            table,
            DriveFlags::TORQUE_ON_BY_GOAL_BIT,
            on,
        )?;
        if let Some(servo) = self.registry.get_mut(id) {
            servo.drive_flags = DriveFlags::from_register(raw);
        }
        Ok(())
    }

    // ── Internal ──────────────────────────────────────────────

    pub(crate) fn descriptor(&self, id: u8) -> Result<&ServoDescriptor> {
        self.registry.lookup(id).ok_or(Error::UnknownId(id))
    }
}

/// Read-modify-write one drive-mode bit.  Returns the value written.
pub(crate) fn update_drive_bit<T: BusTransport>(
    transport: &mut T,
    id: u8,
    table: &ControlTable,
    bit: u8,
    on: bool,
) -> core::result::Result<u8, TransportError> {
    let current = transport.read(id, table.drive_mode)? as u8;
    let next = with_bit(current, bit, on);
    transport.write(id, table.drive_mode, u32::from(next))?;
    debug!("servo {id}: drive mode 0b{current:08b} -> 0b{next:08b}");
    Ok(next)
}

/// Write MAX then MIN position limit.
pub(crate) fn write_limits<T: BusTransport>(
    transport: &mut T,
    id: u8,
    table: &ControlTable,
    min: i32,
    max: i32,
) -> core::result::Result<(), TransportError> {
    transport.write(id, table.max_position_limit, max as u32)?;
    transport.write(id, table.min_position_limit, min as u32)
}
