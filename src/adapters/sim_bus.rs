//! Simulated servo bus.
//!
//! Implements [`BusTransport`] over an in-memory register file per servo.
//! Used by the `dexhand` binary on hosts without hardware and by tests.
//!
//! Behaviour:
//! - Ids that were never added answer nothing ([`TransportError::NoResponse`]).
//!   Grouped writes carry no status reply, so absent ids in a `sync_write`
//!   are silently ignored, as on a real bus.
//! - Writing the goal position while torque is on moves the present
//!   position there immediately.
//! - Failure rules make chosen registers (optionally on one id) fail with
//!   a chosen error until cleared.
//! - Every call is appended to a log for inspection.

use std::collections::BTreeMap;

use log::trace;

use crate::app::ports::{BusTransport, TransportError};
use crate::servo::control_table::{Register, RegisterBytes, ServoModel};

/// Firmware version reported by simulated servos.
pub const SIM_FIRMWARE_VERSION: u8 = 52;
/// Temperature reported by simulated servos (°C).
pub const SIM_TEMPERATURE_C: u8 = 31;
/// Input voltage reported by simulated servos (0.1 V units).
pub const SIM_INPUT_VOLTAGE: u32 = 50;

/// One transport call, as seen by the simulated bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    Read { id: u8, address: u16 },
    Write { id: u8, address: u16, value: u32 },
    SyncWrite { address: u16, ids: Vec<u8> },
    Ping { id: u8 },
    Reboot { id: u8 },
}

#[derive(Debug, Clone, Copy)]
struct FailureRule {
    id: Option<u8>,
    address: u16,
    error: TransportError,
}

#[derive(Debug, Clone)]
struct SimServo {
    model: ServoModel,
    registers: BTreeMap<u16, u32>,
}

impl SimServo {
    fn new(model: ServoModel) -> Self {
        let table = model.table();
        let mut registers = BTreeMap::new();
        registers.insert(table.model_number.address, u32::from(model.model_number()));
        registers.insert(table.firmware_version.address, u32::from(SIM_FIRMWARE_VERSION));
        registers.insert(table.present_temperature.address, u32::from(SIM_TEMPERATURE_C));
        registers.insert(table.present_input_voltage.address, SIM_INPUT_VOLTAGE);
        Self { model, registers }
    }

    fn get(&self, register: Register) -> u32 {
        self.registers.get(&register.address).copied().unwrap_or(0)
    }

    fn set(&mut self, register: Register, value: u32) {
        let value = match register.width.bytes() {
            1 => value & 0xFF,
            2 => value & 0xFFFF,
            _ => value,
        };
        self.registers.insert(register.address, value);

        let table = self.model.table();
        if register.address == table.goal_position.address && self.get(table.torque_enable) == 1 {
            self.registers.insert(table.present_position.address, value);
        }
    }
}

#[derive(Debug, Default)]
pub struct SimulatedBus {
    servos: BTreeMap<u8, SimServo>,
    failures: Vec<FailureRule>,
    calls: Vec<BusCall>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a servo on the bus.
    pub fn add_servo(&mut self, id: u8, model: ServoModel) {
        self.servos.insert(id, SimServo::new(model));
    }

    pub fn with_servos(ids: impl IntoIterator<Item = u8>, model: ServoModel) -> Self {
        let mut bus = Self::new();
        for id in ids {
            bus.add_servo(id, model);
        }
        bus
    }

    pub fn remove_servo(&mut self, id: u8) {
        self.servos.remove(&id);
    }

    /// Make every access to `register` fail, on `id` only or on every id.
    pub fn fail_on(&mut self, id: Option<u8>, register: Register, error: TransportError) {
        self.failures.push(FailureRule {
            id,
            address: register.address,
            error,
        });
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Current register value, bypassing failure rules and the call log.
    pub fn peek(&self, id: u8, register: Register) -> Option<u32> {
        self.servos.get(&id).map(|s| s.get(register))
    }

    /// Set a register directly, bypassing failure rules and the call log.
    pub fn poke(&mut self, id: u8, register: Register, value: u32) {
        if let Some(servo) = self.servos.get_mut(&id) {
            servo.set(register, value);
        }
    }

    pub fn calls(&self) -> &[BusCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<BusCall> {
        std::mem::take(&mut self.calls)
    }

    fn check(&self, id: u8, address: u16) -> Result<(), TransportError> {
        match self
            .failures
            .iter()
            .find(|r| r.address == address && r.id.is_none_or(|rid| rid == id))
        {
            Some(rule) => Err(rule.error),
            None => Ok(()),
        }
    }

    fn servo_mut(&mut self, id: u8) -> Result<&mut SimServo, TransportError> {
        self.servos.get_mut(&id).ok_or(TransportError::NoResponse)
    }
}

impl BusTransport for SimulatedBus {
    fn read(&mut self, id: u8, register: Register) -> Result<u32, TransportError> {
        self.calls.push(BusCall::Read {
            id,
            address: register.address,
        });
        self.check(id, register.address)?;
        let value = self.servo_mut(id)?.get(register);
        trace!("sim: read  id={id} addr={} -> {value}", register.address);
        Ok(value)
    }

    fn write(&mut self, id: u8, register: Register, value: u32) -> Result<(), TransportError> {
        self.calls.push(BusCall::Write {
            id,
            address: register.address,
            value,
        });
        self.check(id, register.address)?;
        self.servo_mut(id)?.set(register, value);
        trace!("sim: write id={id} addr={} <- {value}", register.address);
        Ok(())
    }

    fn sync_write(
        &mut self,
        register: Register,
        payload: &[(u8, RegisterBytes)],
    ) -> Result<(), TransportError> {
        self.calls.push(BusCall::SyncWrite {
            address: register.address,
            ids: payload.iter().map(|(id, _)| *id).collect(),
        });
        for (id, _) in payload {
            self.check(*id, register.address)?;
        }
        for (id, bytes) in payload {
            let value = register.decode(bytes).ok_or(TransportError::Checksum)?;
            if let Some(servo) = self.servos.get_mut(id) {
                servo.set(register, value);
            }
        }
        trace!("sim: sync  addr={} x{}", register.address, payload.len());
        Ok(())
    }

    fn ping(&mut self, id: u8) -> Result<u16, TransportError> {
        self.calls.push(BusCall::Ping { id });
        let servo = self.servo_mut(id)?;
        Ok(servo.model.model_number())
    }

    fn reboot(&mut self, id: u8) -> Result<(), TransportError> {
        self.calls.push(BusCall::Reboot { id });
        let servo = self.servo_mut(id)?;
        let table = servo.model.table();
        servo.set(table.torque_enable, 0);
        Ok(())
    }
}
