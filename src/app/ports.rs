//! Port traits — the hexagonal boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ServoBus / Hand (domain)
//! ```
//!
//! Driven adapters (bus transport, parameter storage, event sinks)
//! implement these traits.  The [`ServoBus`](crate::servo::bus::ServoBus)
//! and [`Hand`](crate::kinematics::hand::Hand) consume them via generics,
//! so the domain core never touches a serial port or a file directly.
//!
//! ## Bus ownership
//!
//! - The bus is half-duplex: exactly one transaction may be in flight.
//!   A [`BusTransport`] is owned by a single `ServoBus` and every call is
//!   synchronous, so serialization falls out of `&mut self`.
//! - Timeouts and retries belong to the transport implementation, never
//!   to the core.

use crate::params::HandParams;
use crate::servo::control_table::{Register, RegisterBytes};

// ───────────────────────────────────────────────────────────────
// Bus transport port (driven adapter: domain ↔ servo bus)
// ───────────────────────────────────────────────────────────────

/// Typed register access over the shared servo bus.
///
/// Values travel as raw little-endian words: a 1-byte register reads back
/// as `0..=255`, a 4-byte register as the full `u32` (reinterpret as `i32`
/// for signed quantities such as positions).
pub trait BusTransport {
    /// Read one register from one servo.
    fn read(&mut self, id: u8, register: Register) -> Result<u32, TransportError>;

    /// Write one register on one servo and wait for its status reply.
    fn write(&mut self, id: u8, register: Register, value: u32) -> Result<(), TransportError>;

    /// One grouped transaction carrying the same register for several servos.
    ///
    /// Every payload must be exactly `register.width` bytes long.
    fn sync_write(
        &mut self,
        register: Register,
        payload: &[(u8, RegisterBytes)],
    ) -> Result<(), TransportError>;

    /// Ping a servo; returns its model number.
    fn ping(&mut self, id: u8) -> Result<u16, TransportError>;

    /// Issue a reboot instruction to a servo.
    fn reboot(&mut self, id: u8) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Parameter store port (driven adapter: domain ↔ persisted parameter set)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the hand's parameter set.
///
/// The format is opaque to the core.  `save` always rewrites the whole
/// set; there is no partial-write contract.
pub trait ParamStore {
    /// Load the full parameter set.
    fn load(&self) -> Result<HandParams, StoreError>;

    /// Persist the full parameter set, replacing whatever was stored.
    fn save(&mut self, params: &HandParams) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`HandEvent`](super::events::HandEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::HandEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Bus-level failure of a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No status packet arrived before the transport's deadline.
    Timeout,
    /// A reply arrived but its checksum did not match.
    Checksum,
    /// The addressed servo is not on the bus.
    NoResponse,
    /// The servo answered with its hardware-alert bit set (payload is the
    /// error byte of the status packet).
    HardwareAlert(u8),
    /// The serial port is not open.
    PortClosed,
}

/// Errors from [`ParamStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No stored parameter set exists.
    NotFound,
    /// Stored data could not be parsed.
    Corrupted(String),
    /// Generic I/O error from the storage backend.
    Io(String),
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::NoResponse => write!(f, "no response"),
            Self::HardwareAlert(code) => write!(f, "hardware alert 0x{code:02x}"),
            Self::PortClosed => write!(f, "port closed"),
        }
    }
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "parameter set not found"),
            Self::Corrupted(msg) => write!(f, "parameter set corrupted: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl std::error::Error for StoreError {}
