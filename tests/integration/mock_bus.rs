//! Mock servo bus for integration tests.
//!
//! Records every transport call so tests can assert on the full
//! transaction history, and fails chosen `(id, register)` pairs on demand.

use std::collections::{BTreeMap, BTreeSet};

use dexhand::app::ports::{BusTransport, TransportError};
use dexhand::servo::control_table::{Register, RegisterBytes};

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read { id: u8, address: u16 },
    Write { id: u8, address: u16, value: u32 },
    SyncWrite { address: u16, entries: Vec<(u8, u32)> },
    Ping { id: u8 },
    Reboot { id: u8 },
}

// ── MockBus ───────────────────────────────────────────────────

pub struct MockBus {
    pub calls: Vec<Call>,
    present: BTreeSet<u8>,
    registers: BTreeMap<(u8, u16), u32>,
    failing: BTreeSet<(u8, u16)>,
    failing_sync: BTreeSet<u16>,
}

#[allow(dead_code)]
impl MockBus {
    /// A bus on which every id in `ids` answers.
    pub fn with_ids(ids: impl IntoIterator<Item = u8>) -> Self {
        Self {
            calls: Vec::new(),
            present: ids.into_iter().collect(),
            registers: BTreeMap::new(),
            failing: BTreeSet::new(),
            failing_sync: BTreeSet::new(),
        }
    }

    pub fn fail(&mut self, id: u8, register: Register) {
        self.failing.insert((id, register.address));
    }

    pub fn fail_sync(&mut self, register: Register) {
        self.failing_sync.insert(register.address);
    }

    pub fn set(&mut self, id: u8, register: Register, value: u32) {
        self.registers.insert((id, register.address), value);
    }

    pub fn get(&self, id: u8, register: Register) -> u32 {
        self.registers
            .get(&(id, register.address))
            .copied()
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn sync_writes(&self) -> Vec<(u16, Vec<(u8, u32)>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SyncWrite { address, entries } => Some((*address, entries.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn sync_writes_to(&self, register: Register) -> Vec<Vec<(u8, u32)>> {
        self.sync_writes()
            .into_iter()
            .filter(|(a, _)| *a == register.address)
            .map(|(_, e)| e)
            .collect()
    }

    pub fn writes_to(&self, id: u8, register: Register) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Write {
                    id: i,
                    address,
                    value,
                } if *i == id && *address == register.address => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn check(&self, id: u8, address: u16) -> Result<(), TransportError> {
        if !self.present.contains(&id) {
            return Err(TransportError::NoResponse);
        }
        if self.failing.contains(&(id, address)) {
            return Err(TransportError::Timeout);
        }
        Ok(())
    }
}

impl BusTransport for MockBus {
    fn read(&mut self, id: u8, register: Register) -> Result<u32, TransportError> {
        self.calls.push(Call::Read {
            id,
            address: register.address,
        });
        self.check(id, register.address)?;
        Ok(self.get(id, register))
    }

    fn write(&mut self, id: u8, register: Register, value: u32) -> Result<(), TransportError> {
        self.calls.push(Call::Write {
            id,
            address: register.address,
            value,
        });
        self.check(id, register.address)?;
        self.set(id, register, value);
        Ok(())
    }

    fn sync_write(
        &mut self,
        register: Register,
        payload: &[(u8, RegisterBytes)],
    ) -> Result<(), TransportError> {
        let entries: Vec<(u8, u32)> = payload
            .iter()
            .map(|(id, bytes)| (*id, register.decode(bytes).unwrap_or(u32::MAX)))
            .collect();
        self.calls.push(Call::SyncWrite {
            address: register.address,
            entries: entries.clone(),
        });
        if self.failing_sync.contains(&register.address) {
            return Err(TransportError::Timeout);
        }
        for (id, value) in entries {
            self.registers.insert((id, register.address), value);
        }
        Ok(())
    }

    fn ping(&mut self, id: u8) -> Result<u16, TransportError> {
        self.calls.push(Call::Ping { id });
        self.check(id, 0)?;
        Ok(1220)
    }

    fn reboot(&mut self, id: u8) -> Result<(), TransportError> {
        self.calls.push(Call::Reboot { id });
        self.check(id, 0)
    }
}
