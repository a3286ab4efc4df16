//! Per-model register maps.
//!
//! Each supported servo model maps a fixed set of named registers to an
//! address and a byte width.  Tables are `'static` and never mutated;
//! a [`ServoDescriptor`](super::ServoDescriptor) only stores its
//! [`ServoModel`] tag and resolves registers through [`ServoModel::table`].
//!
//! Multi-byte values are little-endian on the wire.

use serde::{Deserialize, Serialize};

/// Encoded register payload: 1, 2 or 4 little-endian bytes.
pub type RegisterBytes = heapless::Vec<u8, 4>;

/// Byte width of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    One = 1,
    Two = 2,
    Four = 4,
}

impl Width {
    pub const fn bytes(self) -> usize {
        self as usize
    }
}

/// A storage location on a servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    pub address: u16,
    pub width: Width,
}

impl Register {
    pub const fn new(address: u16, width: Width) -> Self {
        Self { address, width }
    }

    /// Encode the low `width` bytes of `value`, little-endian.
    ///
    /// Signed quantities are passed as their two's-complement `u32`.
    pub fn encode(self, value: u32) -> RegisterBytes {
        // Width is at most 4, the payload capacity.
        value.to_le_bytes()[..self.width.bytes()].iter().copied().collect()
    }

    /// Decode a little-endian payload of this register's width.
    ///
    /// Returns `None` if the slice length does not match the width.
    pub fn decode(self, bytes: &[u8]) -> Option<u32> {
        if bytes.len() != self.width.bytes() {
            return None;
        }
        let mut le = [0u8; 4];
        le[..bytes.len()].copy_from_slice(bytes);
        Some(u32::from_le_bytes(le))
    }
}

/// The registers this core reads or writes, per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlTable {
    pub model_number: Register,
    pub firmware_version: Register,
    pub drive_mode: Register,
    pub operating_mode: Register,
    pub secondary_id: Register,
    pub max_position_limit: Register,
    pub min_position_limit: Register,
    pub startup_configuration: Register,
    pub torque_enable: Register,
    pub profile_velocity: Register,
    pub goal_position: Register,
    pub present_position: Register,
    pub present_input_voltage: Register,
    pub present_temperature: Register,
}

/// X-series protocol-2.0 layout (XC330 / XL330 / XM430 share it).
const X_SERIES: ControlTable = ControlTable {
    model_number: Register::new(0, Width::Two),
    firmware_version: Register::new(6, Width::One),
    drive_mode: Register::new(10, Width::One),
    operating_mode: Register::new(11, Width::One),
    secondary_id: Register::new(12, Width::One),
    max_position_limit: Register::new(48, Width::Four),
    min_position_limit: Register::new(52, Width::Four),
    startup_configuration: Register::new(60, Width::One),
    torque_enable: Register::new(64, Width::One),
    profile_velocity: Register::new(112, Width::Four),
    goal_position: Register::new(116, Width::Four),
    present_position: Register::new(132, Width::Four),
    present_input_voltage: Register::new(144, Width::Two),
    present_temperature: Register::new(146, Width::One),
};

/// Torque enable lives at the same address on every supported model,
/// so torque writes are grouped across models in one transaction.
pub const TORQUE_ENABLE: Register = X_SERIES.torque_enable;

/// Supported servo models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ServoModel {
    #[serde(rename = "XC330")]
    Xc330,
    #[serde(rename = "XL330")]
    Xl330,
    #[serde(rename = "XM430")]
    Xm430,
}

impl ServoModel {
    /// Parse a model name, case-insensitively.  Returns `None` for
    /// models without a known register map.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "XC330" => Some(Self::Xc330),
            "XL330" => Some(Self::Xl330),
            "XM430" => Some(Self::Xm430),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Xc330 => "XC330",
            Self::Xl330 => "XL330",
            Self::Xm430 => "XM430",
        }
    }

    /// Register map for this model.
    pub const fn table(self) -> &'static ControlTable {
        match self {
            Self::Xc330 | Self::Xl330 | Self::Xm430 => &X_SERIES,
        }
    }

    /// Model number reported by a ping.
    pub const fn model_number(self) -> u16 {
        match self {
            Self::Xc330 => 1220,
            Self::Xl330 => 1200,
            Self::Xm430 => 1020,
        }
    }
}

impl core::fmt::Display for ServoModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
